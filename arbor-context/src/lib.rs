// arbor-context: 应用上下文
//
// 在 Bean 工厂之上提供：
// - 一次性的 refresh / close 生命周期
// - BeanFactoryPostProcessor / BeanPostProcessor 的发现与调用
// - `${...}` 占位符配置器
// - 基于 inventory 的组件注册
// - 应用启动器（配置文件、profiles、日志）

pub mod app;
pub mod component;
pub mod context;
pub mod placeholder;
pub mod post_processor;

pub use app::ArborApplication;
pub use component::{Component, ComponentRegistry};
pub use context::{ApplicationContext, ApplicationContextBuilder, ShutdownHook, ENVIRONMENT_BEAN_NAME};
pub use placeholder::{PlaceholderValueResolver, PropertyPlaceholderConfigurer};

// 导出 inventory，供 component! 宏使用
pub use inventory;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::app::ArborApplication;
    pub use crate::component::Component;
    pub use crate::context::{ApplicationContext, ApplicationContextBuilder};
    pub use crate::placeholder::PropertyPlaceholderConfigurer;
    pub use arbor_beans::{
        Args, BeanClass, BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryExt,
        BeanFactoryPostProcessor, BeanObject, BeanPostProcessor, ClassRegistry,
        ConfigurableBeanFactory, ConfigurableListableBeanFactory, DefaultListableBeanFactory,
        FactoryConfig, ListableBeanFactory, ParamSpec, Scope, Value,
    };
    pub use arbor_core::{
        AliasRegistry, ContainerError, ContainerResult, Environment, LogFormat, LogLevel,
        LoggingConfig, MapPropertySource, PropertySource, TomlPropertySource,
    };
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
