//! 把定义中的 `Value` 解析成实例

use std::sync::Arc;

use arbor_core::utils::naming::unique_bean_name;
use arbor_core::{ContainerError, ContainerResult};

use crate::definition::BeanDefinition;
use crate::factory::{
    BeanDefinitionRegistry, BeanFactory, ConfigurableBeanFactory, DefaultListableBeanFactory,
};
use crate::value::Value;
use crate::BeanObject;

/// 内部 Bean 生成名称的前缀
pub const INNER_BEAN_NAME: &str = "(inner bean)";

/// 为某个 Bean 解析定义中的值
pub struct BeanDefinitionValueResolver<'a> {
    factory: &'a DefaultListableBeanFactory,
    bean_name: &'a str,
    definition: &'a BeanDefinition,
}

impl<'a> BeanDefinitionValueResolver<'a> {
    pub fn new(
        factory: &'a DefaultListableBeanFactory,
        bean_name: &'a str,
        definition: &'a BeanDefinition,
    ) -> Self {
        Self {
            factory,
            bean_name,
            definition,
        }
    }

    /// 解析一个值
    ///
    /// - 引用：获取被引用的 Bean 并记录依赖关系
    /// - 内部 Bean：以生成的唯一名称创建，随外部 Bean 一起销毁
    /// - 列表：逐个解析，空值被丢弃
    /// - 字符串：经过容器的内嵌值解析器（占位符）
    pub fn resolve_value_if_necessary(
        &self,
        arg_name: &str,
        value: &Value,
    ) -> ContainerResult<Option<BeanObject>> {
        match value {
            Value::Null => Ok(None),
            Value::Ref(name) => self.resolve_reference(arg_name, name).map(Some),
            Value::Bean(inner) => self.resolve_inner_bean(arg_name, inner).map(Some),
            Value::List(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let element_name = format!("{} with key [{}]", arg_name, i);
                    if let Some(v) = self.resolve_value_if_necessary(&element_name, item)? {
                        resolved.push(v);
                    }
                }
                Ok(Some(Arc::new(resolved)))
            }
            Value::Str(s) => Ok(self
                .factory
                .resolve_embedded_value(s)?
                .map(|resolved| Arc::new(resolved) as BeanObject)),
            Value::Int(v) => Ok(Some(Arc::new(*v))),
            Value::Float(v) => Ok(Some(Arc::new(*v))),
            Value::Bool(v) => Ok(Some(Arc::new(*v))),
            Value::Object(obj) => Ok(Some(obj.clone())),
        }
    }

    fn resolve_reference(&self, arg_name: &str, name: &str) -> ContainerResult<BeanObject> {
        let ref_name = self
            .factory
            .resolve_embedded_value(name)?
            .ok_or_else(|| {
                ContainerError::creation(
                    self.bean_name,
                    format!("Bean reference for {} resolved to null", arg_name),
                )
            })?;
        let bean = self.factory.get_bean(&ref_name).map_err(|e| {
            ContainerError::creation_caused_by(
                self.bean_name,
                format!(
                    "Cannot resolve reference to bean '{}' while setting {}",
                    ref_name, arg_name
                ),
                e,
            )
        })?;
        self.factory.register_dependent_bean(&ref_name, self.bean_name);
        Ok(bean)
    }

    fn resolve_inner_bean(
        &self,
        arg_name: &str,
        inner: &BeanDefinition,
    ) -> ContainerResult<BeanObject> {
        let inner_name = unique_bean_name(INNER_BEAN_NAME, |candidate| {
            self.factory.is_bean_name_in_use(candidate)
        });
        let type_desc = inner.class_name().unwrap_or("unknown").to_string();
        let wrap = |e: ContainerError| {
            ContainerError::creation_caused_by(
                self.bean_name,
                format!(
                    "Cannot create inner bean '{}' of type [{}] while setting {}",
                    inner_name, type_desc, arg_name
                ),
                e,
            )
        };

        let mut merged = self.factory.merge_bean_definition(inner).map_err(wrap)?;
        // 单例内部 Bean 挂在非单例外部 Bean 上时跟随外部 Bean 的作用域
        if !self.definition.is_singleton() && merged.is_singleton() {
            merged.scope = Some(self.definition.scope());
        }

        for dependency in &merged.depends_on {
            self.factory.register_dependent_bean(dependency, &inner_name);
            self.factory.get_bean(dependency).map_err(wrap)?;
        }

        self.factory.register_contained_bean(&inner_name, self.bean_name);
        tracing::trace!(
            "Creating inner bean '{}' for bean '{}'",
            inner_name,
            self.bean_name
        );
        self.factory
            .create_bean(&inner_name, &Arc::new(merged), None)
            .map_err(wrap)
    }
}
