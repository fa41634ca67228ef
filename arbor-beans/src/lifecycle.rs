//! 容器扩展钩子
//!
//! - `BeanPostProcessor`：Bean 实例初始化前后的处理
//! - `BeanFactoryPostProcessor`：Bean 实例化之前修改定义
//! - `DisposableBeanAdapter`：把销毁相关的回调收拢成一个 `DisposableBean`

use std::sync::Arc;

use arbor_core::{ContainerError, ContainerResult};

use crate::class::{BeanCallback, BeanClass};
use crate::definition::{BeanDefinition, LifecycleCallback};
use crate::factory::DefaultListableBeanFactory;
use crate::BeanObject;

/// BeanPostProcessor trait
///
/// 在 Bean 初始化的不同阶段提供钩子，允许自定义修改 Bean 实例
///
/// 使用场景：
/// - 代理包装
/// - 属性校验
/// - 标记接口回调
///
/// Rust 中无法在运行时判断一个处理器是否实现了更细的子接口，
/// 所以通过 `as_*` 方法显式暴露。
pub trait BeanPostProcessor: Send + Sync {
    /// 在 Bean 初始化回调（init）之前调用
    ///
    /// 返回处理后的 Bean 实例（可以是原始 Bean，也可以是包装后的 Bean）
    fn post_process_before_initialization(
        &self,
        bean: BeanObject,
        _bean_name: &str,
    ) -> ContainerResult<BeanObject> {
        Ok(bean)
    }

    /// 在 Bean 初始化回调（init）之后调用
    fn post_process_after_initialization(
        &self,
        bean: BeanObject,
        _bean_name: &str,
    ) -> ContainerResult<BeanObject> {
        Ok(bean)
    }

    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }

    /// 获取处理器的优先级（数字越小优先级越高）
    fn order(&self) -> i32 {
        1000
    }

    fn as_smart_instantiation_aware(&self) -> Option<&dyn SmartInstantiationAwareBeanPostProcessor> {
        None
    }

    fn as_destruction_aware(&self) -> Option<&dyn DestructionAwareBeanPostProcessor> {
        None
    }
}

/// 参与循环引用的早期引用暴露
pub trait SmartInstantiationAwareBeanPostProcessor: BeanPostProcessor {
    /// 获取提前暴露的引用
    ///
    /// 只有当 Bean 被循环引用时才会调用。返回包装对象时，
    /// `post_process_after_initialization` 应当对同一个 Bean 返回同一个包装对象，
    /// 否则依赖方拿到的早期引用与最终暴露的实例不一致。
    fn get_early_bean_reference(&self, bean: BeanObject, _bean_name: &str) -> ContainerResult<BeanObject> {
        Ok(bean)
    }
}

/// 销毁前回调
pub trait DestructionAwareBeanPostProcessor: BeanPostProcessor {
    fn post_process_before_destruction(&self, bean: &BeanObject, bean_name: &str) -> ContainerResult<()>;

    /// 该 Bean 是否需要本处理器参与销毁
    fn requires_destruction(&self, _bean: &BeanObject) -> bool {
        true
    }
}

/// BeanFactoryPostProcessor trait
///
/// 所有定义注册完成、任何 Bean 实例化之前调用，可以修改定义
pub trait BeanFactoryPostProcessor: Send + Sync {
    fn post_process_bean_factory(&self, factory: &DefaultListableBeanFactory) -> ContainerResult<()>;

    fn name(&self) -> &str {
        "BeanFactoryPostProcessor"
    }

    fn order(&self) -> i32 {
        1000
    }

    /// 同时也是 BeanDefinitionRegistryPostProcessor 时返回自身
    fn as_registry_post_processor(&self) -> Option<&dyn BeanDefinitionRegistryPostProcessor> {
        None
    }
}

/// 可以继续注册定义的 BeanFactoryPostProcessor，先于普通处理器执行
pub trait BeanDefinitionRegistryPostProcessor: BeanFactoryPostProcessor {
    fn post_process_bean_definition_registry(
        &self,
        registry: &DefaultListableBeanFactory,
    ) -> ContainerResult<()>;
}

/// 容器关闭时需要销毁的 Bean
pub trait DisposableBean: Send + Sync {
    fn destroy(&self) -> ContainerResult<()>;
}

/// 销毁适配器
///
/// 依次执行：销毁感知处理器、类型上的 DisposableBean 回调、定义中的 destroy 方法
pub struct DisposableBeanAdapter {
    bean: BeanObject,
    bean_name: String,
    disposable: Option<BeanCallback>,
    destroy_method: Option<(String, BeanCallback)>,
    processors: Vec<Arc<dyn BeanPostProcessor>>,
}

impl DisposableBeanAdapter {
    /// 为 Bean 构建销毁适配器，没有任何销毁逻辑时返回 None
    ///
    /// `class` 是实例实际类型的元数据（工厂方法产生的实例可能与定义的类型不同）
    pub fn for_bean(
        bean: BeanObject,
        bean_name: &str,
        definition: &BeanDefinition,
        class: Option<&BeanClass>,
        processors: &[Arc<dyn BeanPostProcessor>],
    ) -> ContainerResult<Option<Self>> {
        let disposable = class.and_then(|c| c.disposable_callback().cloned());

        let destroy_method = match &definition.destroy_method {
            None => None,
            Some(LifecycleCallback::Callback(callback)) => {
                Some(("<callback>".to_string(), callback.clone()))
            }
            Some(LifecycleCallback::Named(name)) => {
                let method = class.and_then(|c| c.method(name)).cloned().ok_or_else(|| {
                    ContainerError::BeanDefinitionStore {
                        bean: bean_name.to_string(),
                        message: format!("Could not find a destroy method named '{}'", name),
                    }
                })?;
                Some((name.clone(), method))
            }
        };

        let processors: Vec<Arc<dyn BeanPostProcessor>> = processors
            .iter()
            .filter(|p| {
                p.as_destruction_aware()
                    .map_or(false, |d| d.requires_destruction(&bean))
            })
            .cloned()
            .collect();

        if disposable.is_none() && destroy_method.is_none() && processors.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            bean,
            bean_name: bean_name.to_string(),
            disposable,
            destroy_method,
            processors,
        }))
    }
}

impl DisposableBean for DisposableBeanAdapter {
    fn destroy(&self) -> ContainerResult<()> {
        for processor in &self.processors {
            if let Some(aware) = processor.as_destruction_aware() {
                aware.post_process_before_destruction(&self.bean, &self.bean_name)?;
            }
        }

        if let Some(disposable) = &self.disposable {
            tracing::trace!("Invoking destroy() on bean with name '{}'", self.bean_name);
            if let Err(e) = disposable(&self.bean) {
                tracing::warn!(
                    "Invocation of destroy method failed on bean with name '{}': {}",
                    self.bean_name,
                    e
                );
            }
        }

        if let Some((method_name, method)) = &self.destroy_method {
            tracing::trace!(
                "Invoking destroy method '{}' on bean with name '{}'",
                method_name,
                self.bean_name
            );
            if let Err(e) = method(&self.bean) {
                tracing::warn!(
                    "Invocation of destroy method '{}' failed on bean with name '{}': {}",
                    method_name,
                    self.bean_name,
                    e
                );
            }
        }
        Ok(())
    }
}
