// arbor-beans: Bean 定义与 Bean 工厂
//
// - 类型元数据（构造函数 / 工厂方法 / 属性 / 回调的显式登记）
// - BeanDefinition 与父子定义合并
// - 三级缓存的单例注册表，处理循环引用
// - 构造函数 / 工厂方法解析与自动装配
// - BeanPostProcessor / BeanFactoryPostProcessor 扩展点
// - TOML 定义读取器

use std::any::Any;
use std::sync::Arc;

pub mod class;
pub mod constructor;
pub mod definition;
pub mod factory;
pub mod lifecycle;
pub mod reader;
pub mod scope;
pub mod singleton;
pub mod tracker;
pub mod value;
pub mod value_resolver;
pub mod visitor;

/// 容器中的 Bean 实例
pub type BeanObject = Arc<dyn Any + Send + Sync>;

// 重新导出常用类型
pub use class::{
    instance_type_id, Args, BeanCapabilities, BeanClass, BeanClassBuilder, ClassRegistry,
    Executable, ParamSpec,
};
pub use definition::{AutowireMode, BeanDefinition, BeanRole, LifecycleCallback};
pub use factory::{
    AutowireCapableBeanFactory, BeanDefinitionRegistry, BeanFactory, BeanFactoryExt,
    ConfigurableBeanFactory, ConfigurableListableBeanFactory, DefaultListableBeanFactory,
    DependencyDescriptor, FactoryConfig, ListableBeanFactory,
};
pub use lifecycle::{
    BeanDefinitionRegistryPostProcessor, BeanFactoryPostProcessor, BeanPostProcessor,
    DestructionAwareBeanPostProcessor, DisposableBean, DisposableBeanAdapter,
    SmartInstantiationAwareBeanPostProcessor,
};
pub use reader::TomlBeanDefinitionReader;
pub use scope::Scope;
pub use singleton::DefaultSingletonBeanRegistry;
pub use value::{ConstructorArgumentValues, PropertyValues, TypeConverter, Value, ValueHolder};
pub use visitor::BeanDefinitionVisitor;
