//! `${...}` 占位符配置器
//!
//! 作为 BeanFactoryPostProcessor 运行：解析所有定义中的字符串值和别名，
//! 并把同一个解析器注册为工厂的内嵌值解析器，供之后的字符串值使用。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use arbor_beans::{
    BeanClass, BeanDefinitionVisitor, BeanFactoryPostProcessor, ConfigurableBeanFactory,
    DefaultListableBeanFactory, ParamSpec,
};
use arbor_core::{ContainerError, ContainerResult, Environment, PlaceholderResolver, StringValueResolver};

/// 基于 Environment 的占位符解析器
#[derive(Clone)]
pub struct PlaceholderValueResolver {
    environment: Arc<Environment>,
    helper: PlaceholderResolver,
    null_value: Option<String>,
    trim_values: bool,
}

impl PlaceholderValueResolver {
    pub fn new(environment: Arc<Environment>, ignore_unresolvable: bool) -> Self {
        Self {
            environment,
            helper: PlaceholderResolver::new().ignore_unresolvable(ignore_unresolvable),
            null_value: None,
            trim_values: false,
        }
    }
}

impl StringValueResolver for PlaceholderValueResolver {
    fn resolve_string_value(&self, value: &str) -> ContainerResult<Option<String>> {
        let environment = &self.environment;
        let mut resolved = self
            .helper
            .resolve(value, &|key| environment.get_string(key))?;
        if self.trim_values {
            resolved = resolved.trim().to_string();
        }
        if self.null_value.as_deref() == Some(resolved.as_str()) {
            return Ok(None);
        }
        Ok(Some(resolved))
    }
}

/// 占位符配置器
///
/// 可以直接添加到上下文，也可以通过 [`PropertyPlaceholderConfigurer::bean_class`] 声明为 Bean
pub struct PropertyPlaceholderConfigurer {
    environment: Arc<Environment>,
    ignore_unresolvable: AtomicBool,
    trim_values: AtomicBool,
    null_value: RwLock<Option<String>>,
    /// 自身的 Bean 名称，解析时跳过自己的定义
    bean_name: RwLock<Option<String>>,
    order: i32,
}

impl PropertyPlaceholderConfigurer {
    pub fn new(environment: Arc<Environment>) -> Self {
        Self {
            environment,
            ignore_unresolvable: AtomicBool::new(false),
            trim_values: AtomicBool::new(false),
            null_value: RwLock::new(None),
            bean_name: RwLock::new(None),
            order: i32::MAX,
        }
    }

    /// 无法解析的占位符原样保留，而不是报错
    pub fn with_ignore_unresolvable(self, ignore: bool) -> Self {
        self.ignore_unresolvable.store(ignore, Ordering::SeqCst);
        self
    }

    pub fn with_trim_values(self, trim: bool) -> Self {
        self.trim_values.store(trim, Ordering::SeqCst);
        self
    }

    /// 解析结果等于该值时视为空值
    pub fn with_null_value(self, null_value: impl Into<String>) -> Self {
        *self.null_value.write() = Some(null_value.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn value_resolver(&self) -> PlaceholderValueResolver {
        let mut resolver = PlaceholderValueResolver::new(
            self.environment.clone(),
            self.ignore_unresolvable.load(Ordering::SeqCst),
        );
        resolver.null_value = self.null_value.read().clone();
        resolver.trim_values = self.trim_values.load(Ordering::SeqCst);
        resolver
    }

    /// 类型元数据：构造参数按类型注入 Environment，支持以下属性
    /// - `ignore-unresolvable`
    /// - `trim-values`
    /// - `null-value`
    pub fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<PropertyPlaceholderConfigurer>("PropertyPlaceholderConfigurer")
            .constructor(vec![ParamSpec::of::<Environment>().named("environment")], |args| {
                Ok(PropertyPlaceholderConfigurer::new(args.get::<Environment>(0)?))
            })
            .property("ignore-unresolvable", |c: &PropertyPlaceholderConfigurer, v: Arc<bool>| {
                c.ignore_unresolvable.store(*v, Ordering::SeqCst);
                Ok(())
            })
            .property("trim-values", |c: &PropertyPlaceholderConfigurer, v: Arc<bool>| {
                c.trim_values.store(*v, Ordering::SeqCst);
                Ok(())
            })
            .property("null-value", |c: &PropertyPlaceholderConfigurer, v: Arc<String>| {
                *c.null_value.write() = Some((*v).clone());
                Ok(())
            })
            .bean_name_aware(|c: &PropertyPlaceholderConfigurer, name| {
                *c.bean_name.write() = Some(name.to_string());
            })
            .bean_factory_post_processor()
            .build()
    }
}

impl BeanFactoryPostProcessor for PropertyPlaceholderConfigurer {
    fn post_process_bean_factory(&self, factory: &DefaultListableBeanFactory) -> ContainerResult<()> {
        let resolver = self.value_resolver();
        let own_name = self.bean_name.read().clone();

        let visitor = BeanDefinitionVisitor::new(&resolver);
        factory.modify_bean_definitions(|name, definition| {
            if own_name.as_deref() == Some(name) {
                return Ok(());
            }
            visitor
                .visit_bean_definition(definition)
                .map_err(|e| ContainerError::BeanDefinitionStore {
                    bean: name.to_string(),
                    message: e.to_string(),
                })
        })?;

        factory.resolve_aliases(&resolver)?;
        factory.add_embedded_value_resolver(Arc::new(resolver));
        tracing::debug!("Resolved placeholders in bean definitions and aliases");
        Ok(())
    }

    fn name(&self) -> &str {
        "PropertyPlaceholderConfigurer"
    }

    fn order(&self) -> i32 {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_beans::{BeanDefinition, BeanDefinitionRegistry, Value};
    use arbor_core::{AliasRegistry, MapPropertySource};

    fn environment() -> Arc<Environment> {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test")
                .with("db.name", "orders")
                .with("db.pool", "  8 ")
                .with("db.user", "none"),
        ));
        Arc::new(env)
    }

    #[test]
    fn test_resolves_definitions_and_aliases() {
        let factory = DefaultListableBeanFactory::new();
        factory
            .register_bean_definition(
                "repository",
                BeanDefinition::from_supplier(|| Ok(1u8))
                    .with_property("table", "${db.name}_table")
                    .with_property("target", Value::reference("${db.name}DataSource")),
            )
            .unwrap();
        factory.register_alias("repository", "${db.name}Repository").unwrap();

        PropertyPlaceholderConfigurer::new(environment())
            .post_process_bean_factory(&factory)
            .unwrap();

        let definition = factory.get_bean_definition("repository").unwrap();
        assert!(matches!(
            definition.property_values.get("table"),
            Some(Value::Str(s)) if s == "orders_table"
        ));
        assert!(matches!(
            definition.property_values.get("target"),
            Some(Value::Ref(s)) if s == "ordersDataSource"
        ));
        assert_eq!(factory.transformed_bean_name("ordersRepository"), "repository");
        assert!(factory.has_embedded_value_resolver());
        assert_eq!(
            factory.resolve_embedded_value("db=${db.name}").unwrap().as_deref(),
            Some("db=orders")
        );
    }

    #[test]
    fn test_unresolvable_placeholder_names_the_bean() {
        let factory = DefaultListableBeanFactory::new();
        factory
            .register_bean_definition(
                "broken",
                BeanDefinition::from_supplier(|| Ok(1u8)).with_property("x", "${missing.key}"),
            )
            .unwrap();

        let err = PropertyPlaceholderConfigurer::new(environment())
            .post_process_bean_factory(&factory)
            .unwrap_err();
        match err {
            ContainerError::BeanDefinitionStore { bean, .. } => assert_eq!(bean, "broken"),
            other => panic!("unexpected error: {}", other),
        }
        // 定义保持原样
        let definition = factory.get_bean_definition("broken").unwrap();
        assert!(matches!(
            definition.property_values.get("x"),
            Some(Value::Str(s)) if s == "${missing.key}"
        ));
    }

    #[test]
    fn test_ignore_unresolvable_trim_and_null_value() {
        let resolver = PropertyPlaceholderConfigurer::new(environment())
            .with_ignore_unresolvable(true)
            .with_trim_values(true)
            .with_null_value("none")
            .value_resolver();

        assert_eq!(
            resolver.resolve_string_value("${missing.key}").unwrap().as_deref(),
            Some("${missing.key}")
        );
        assert_eq!(resolver.resolve_string_value("${db.pool}").unwrap().as_deref(), Some("8"));
        assert_eq!(resolver.resolve_string_value("${db.user}").unwrap(), None);
    }
}
