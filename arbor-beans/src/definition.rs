use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

use arbor_core::{ContainerError, ContainerResult};

use crate::class::{BeanCallback, BeanCapabilities, BeanClass, Executable};
use crate::lifecycle::{BeanFactoryPostProcessor, BeanPostProcessor};
use crate::value::{ConstructorArgumentValues, PropertyValues, Value, ValueHolder};
use crate::{BeanObject, Scope};

/// 自动装配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutowireMode {
    /// 不自动装配（默认）
    #[default]
    No,
    /// 按属性名查找同名 Bean
    ByName,
    /// 按属性类型查找唯一候选
    ByType,
    /// 构造函数参数按类型装配
    Constructor,
}

/// Bean 的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeanRole {
    /// 应用自己的 Bean
    #[default]
    Application,
    /// 较大配置的一部分
    Support,
    /// 容器内部使用
    Infrastructure,
}

/// 实例提供函数，替代反射实例化
#[derive(Clone)]
pub struct InstanceSupplier {
    pub type_id: TypeId,
    pub type_name: &'static str,
    supplier: Arc<dyn Fn() -> ContainerResult<BeanObject> + Send + Sync>,
}

impl InstanceSupplier {
    pub fn get(&self) -> ContainerResult<BeanObject> {
        (self.supplier)()
    }
}

/// init / destroy 回调：按名称引用类型上的方法，或者直接给出闭包
#[derive(Clone)]
pub enum LifecycleCallback {
    Named(String),
    Callback(BeanCallback),
}

impl fmt::Debug for LifecycleCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleCallback::Named(name) => write!(f, "{}", name),
            LifecycleCallback::Callback(_) => write!(f, "<callback>"),
        }
    }
}

/// 预备参数：缓存后再次创建原型时需要重新解析的参数
#[derive(Clone)]
pub(crate) enum PreparedArgument {
    /// 已转换好的值
    Resolved(Option<BeanObject>),
    /// 按类型自动装配的参数
    Autowired,
    /// 需要重新解析的原始值
    Source(Value),
}

/// 已解析的构造函数 / 工厂方法缓存
#[derive(Clone, Default)]
pub(crate) struct ResolvedExecutableCache {
    pub(crate) executable: Option<Executable>,
    /// 唯一候选的工厂方法（提前解析，用于类型预测）
    pub(crate) factory_method_to_introspect: Option<Executable>,
    pub(crate) arguments_resolved: bool,
    pub(crate) resolved_arguments: Option<Vec<Option<BeanObject>>>,
    pub(crate) prepared_arguments: Option<Vec<PreparedArgument>>,
}

/// Bean 定义 - 描述如何创建和管理 Bean
///
/// 一个定义可以注册在多个名称下（也可以作为内部 Bean 没有名称），所以名称不在定义里
#[derive(Clone)]
pub struct BeanDefinition {
    /// 类名（定义读取器使用，`bean_class` 存在时以其为准）
    pub class_name: Option<String>,

    /// 类型元数据
    pub bean_class: Option<Arc<BeanClass>>,

    /// 作用域，未设置时继承父定义，最终默认单例
    pub scope: Option<Scope>,

    /// 是否延迟初始化（仅对单例有效）
    pub lazy: bool,

    /// 抽象定义只作为父模板，不能实例化
    pub is_abstract: bool,

    /// 按类型装配出现多个候选时优先
    pub primary: bool,

    /// 是否作为其他 Bean 的自动装配候选
    pub autowire_candidate: bool,

    pub autowire_mode: AutowireMode,

    /// 必须先初始化的 Bean
    pub depends_on: Vec<String>,

    pub constructor_args: ConstructorArgumentValues,

    pub property_values: PropertyValues,

    pub instance_supplier: Option<InstanceSupplier>,

    /// 实例工厂方法所在的 Bean
    pub factory_bean_name: Option<String>,

    pub factory_method_name: Option<String>,

    pub init_method: Option<LifecycleCallback>,

    pub destroy_method: Option<LifecycleCallback>,

    /// 宽松模式下构造函数歧义不报错，取第一个权重最小的候选
    pub lenient_constructor_resolution: bool,

    /// 合成定义不应用 BeanPostProcessor
    pub synthetic: bool,

    pub role: BeanRole,

    pub description: Option<String>,

    /// 父定义名称
    pub parent_name: Option<String>,

    /// 容器接口能力（为空时使用类型上声明的能力）
    pub capabilities: BeanCapabilities,

    pub(crate) resolution: Arc<Mutex<ResolvedExecutableCache>>,
}

impl Default for BeanDefinition {
    fn default() -> Self {
        Self {
            class_name: None,
            bean_class: None,
            scope: None,
            lazy: false,
            is_abstract: false,
            primary: false,
            autowire_candidate: true,
            autowire_mode: AutowireMode::No,
            depends_on: Vec::new(),
            constructor_args: ConstructorArgumentValues::new(),
            property_values: PropertyValues::new(),
            instance_supplier: None,
            factory_bean_name: None,
            factory_method_name: None,
            init_method: None,
            destroy_method: None,
            lenient_constructor_resolution: true,
            synthetic: false,
            role: BeanRole::Application,
            description: None,
            parent_name: None,
            capabilities: BeanCapabilities::default(),
            resolution: Arc::new(Mutex::new(ResolvedExecutableCache::default())),
        }
    }
}

impl BeanDefinition {
    /// 创建空定义（通常配合 `with_factory_bean` 使用）
    pub fn new() -> Self {
        Self::default()
    }

    /// 以类型元数据创建定义
    pub fn of_class(class: Arc<BeanClass>) -> Self {
        Self {
            class_name: Some(class.name().to_string()),
            bean_class: Some(class),
            ..Self::default()
        }
    }

    /// 以提供函数创建定义
    pub fn from_supplier<T, F>(supplier: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self {
            instance_supplier: Some(InstanceSupplier {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                supplier: Arc::new(move || Ok(Arc::new(supplier()?) as BeanObject)),
            }),
            ..Self::default()
        }
    }

    /// 子定义，创建时与父定义合并
    pub fn child(parent_name: impl Into<String>) -> Self {
        Self {
            parent_name: Some(parent_name.into()),
            ..Self::default()
        }
    }

    /// 设置类名（需要在注册前解析成 `BeanClass`）
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// 设置延迟初始化
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_autowire_candidate(mut self, candidate: bool) -> Self {
        self.autowire_candidate = candidate;
        self
    }

    pub fn with_autowire_mode(mut self, mode: AutowireMode) -> Self {
        self.autowire_mode = mode;
        self
    }

    /// 设置依赖列表
    pub fn with_depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = names.into_iter().map(Into::into).collect();
        self
    }

    /// 追加通用构造参数
    pub fn with_constructor_arg(mut self, value: impl Into<Value>) -> Self {
        self.constructor_args.add_generic(ValueHolder::new(value));
        self
    }

    /// 追加带限定的通用构造参数
    pub fn with_constructor_holder(mut self, holder: ValueHolder) -> Self {
        self.constructor_args.add_generic(holder);
        self
    }

    /// 设置指定下标的构造参数
    pub fn with_indexed_arg(mut self, index: usize, value: impl Into<Value>) -> Self {
        self.constructor_args.add_indexed(index, ValueHolder::new(value));
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.property_values.add(name, value);
        self
    }

    pub fn with_factory_bean(mut self, factory_bean_name: impl Into<String>) -> Self {
        self.factory_bean_name = Some(factory_bean_name.into());
        self
    }

    pub fn with_factory_method(mut self, factory_method_name: impl Into<String>) -> Self {
        self.factory_method_name = Some(factory_method_name.into());
        self
    }

    /// 按名称引用类型上登记的初始化方法
    pub fn with_init_method(mut self, name: impl Into<String>) -> Self {
        self.init_method = Some(LifecycleCallback::Named(name.into()));
        self
    }

    /// 按名称引用类型上登记的销毁方法
    pub fn with_destroy_method(mut self, name: impl Into<String>) -> Self {
        self.destroy_method = Some(LifecycleCallback::Named(name.into()));
        self
    }

    /// 设置初始化回调
    pub fn with_init<T, F>(mut self, init_fn: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.init_method = Some(LifecycleCallback::Callback(typed_callback(init_fn)));
        self
    }

    /// 设置销毁回调
    pub fn with_destroy<T, F>(mut self, destroy_fn: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.destroy_method = Some(LifecycleCallback::Callback(typed_callback(destroy_fn)));
        self
    }

    pub fn with_lenient_constructor_resolution(mut self, lenient: bool) -> Self {
        self.lenient_constructor_resolution = lenient;
        self
    }

    pub fn with_synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }

    pub fn with_role(mut self, role: BeanRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 声明该定义产生的 Bean 是 BeanPostProcessor
    pub fn with_bean_post_processor_role<T: BeanPostProcessor + 'static>(mut self) -> Self {
        self.capabilities.bean_post_processor =
            Some(BeanCapabilities::bean_post_processor::<T>());
        self.role = BeanRole::Infrastructure;
        self
    }

    /// 声明该定义产生的 Bean 是 BeanFactoryPostProcessor
    pub fn with_factory_post_processor_role<T: BeanFactoryPostProcessor + 'static>(
        mut self,
    ) -> Self {
        self.capabilities.bean_factory_post_processor =
            Some(BeanCapabilities::bean_factory_post_processor::<T>());
        self.role = BeanRole::Infrastructure;
        self
    }

    pub fn class_name(&self) -> Option<&str> {
        self.bean_class
            .as_ref()
            .map(|c| c.name())
            .or(self.class_name.as_deref())
    }

    pub fn scope(&self) -> Scope {
        self.scope.unwrap_or_default()
    }

    pub fn is_singleton(&self) -> bool {
        self.scope() == Scope::Singleton
    }

    pub fn is_prototype(&self) -> bool {
        self.scope() == Scope::Prototype
    }

    pub fn has_constructor_argument_values(&self) -> bool {
        !self.constructor_args.is_empty()
    }

    /// 定义自身声明的能力优先，其次是类型上声明的
    pub fn effective_capabilities(&self) -> BeanCapabilities {
        match &self.bean_class {
            Some(class) => self.capabilities.or(class.capabilities()),
            None => self.capabilities.clone(),
        }
    }

    /// 注册前的校验
    pub fn validate(&self) -> ContainerResult<()> {
        let invalid = |message: &str| {
            Err(ContainerError::IllegalState(message.to_string()))
        };
        if self.factory_bean_name.is_some() && self.factory_method_name.is_none() {
            return invalid("factory-bean reference requires a factory-method");
        }
        if self.is_abstract || self.parent_name.is_some() {
            return Ok(());
        }
        if self.instance_supplier.is_none()
            && self.factory_method_name.is_none()
            && self.bean_class.is_none()
        {
            return match &self.class_name {
                Some(name) => invalid(&format!("Class '{}' has no registered metadata", name)),
                None => invalid("Bean definition has neither a class nor a supplier nor a factory method"),
            };
        }
        Ok(())
    }

    /// 以 parent 为基础，用本定义覆盖，得到合并后的定义
    pub fn merge_with_parent(&self, parent: &BeanDefinition) -> BeanDefinition {
        let mut merged = parent.clone();

        if self.bean_class.is_some() || self.class_name.is_some() {
            merged.bean_class = self.bean_class.clone();
            merged.class_name = self.class_name.clone();
        }
        if self.scope.is_some() {
            merged.scope = self.scope;
        }
        merged.lazy = self.lazy;
        merged.is_abstract = self.is_abstract;
        merged.primary = self.primary;
        merged.autowire_candidate = self.autowire_candidate;
        merged.autowire_mode = self.autowire_mode;
        merged.depends_on = self.depends_on.clone();
        merged.constructor_args.add_all(&self.constructor_args);
        merged.property_values.add_all(&self.property_values);
        if self.instance_supplier.is_some() {
            merged.instance_supplier = self.instance_supplier.clone();
        }
        if self.factory_bean_name.is_some() {
            merged.factory_bean_name = self.factory_bean_name.clone();
        }
        if self.factory_method_name.is_some() {
            merged.factory_method_name = self.factory_method_name.clone();
        }
        if self.init_method.is_some() {
            merged.init_method = self.init_method.clone();
        }
        if self.destroy_method.is_some() {
            merged.destroy_method = self.destroy_method.clone();
        }
        merged.lenient_constructor_resolution = self.lenient_constructor_resolution;
        merged.synthetic = self.synthetic;
        merged.role = self.role;
        if self.description.is_some() {
            merged.description = self.description.clone();
        }
        merged.capabilities = self.capabilities.or(&parent.capabilities);
        merged.parent_name = self.parent_name.clone();
        merged.resolution = Arc::new(Mutex::new(ResolvedExecutableCache::default()));
        merged
    }

    /// 作为合并结果使用的副本（独立的解析缓存）
    pub fn to_merged(&self) -> BeanDefinition {
        let mut merged = self.clone();
        merged.resolution = Arc::new(Mutex::new(ResolvedExecutableCache::default()));
        merged
    }

    /// 已解析的构造函数或工厂方法
    pub fn resolved_executable(&self) -> Option<Executable> {
        self.resolution.lock().executable.clone()
    }

    pub(crate) fn factory_method_to_introspect(&self) -> Option<Executable> {
        let cache = self.resolution.lock();
        cache
            .factory_method_to_introspect
            .clone()
            .or_else(|| cache.executable.clone().filter(|e| !e.is_constructor()))
    }
}

fn typed_callback<T, F>(f: F) -> BeanCallback
where
    T: Any + Send + Sync,
    F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
{
    Arc::new(move |bean: &BeanObject| {
        let target = (**bean).downcast_ref::<T>().ok_or_else(|| ContainerError::TypeMismatch {
            bean: "lifecycle callback target".to_string(),
            expected: std::any::type_name::<T>().to_string(),
            found: "incompatible instance".to_string(),
        })?;
        f(target)
    })
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("class", &self.class_name())
            .field("scope", &self.scope())
            .field("lazy", &self.lazy)
            .field("abstract", &self.is_abstract)
            .field("primary", &self.primary)
            .field("autowire_mode", &self.autowire_mode)
            .field("depends_on", &self.depends_on)
            .field("constructor_args", &self.constructor_args)
            .field("property_values", &self.property_values)
            .field("factory_bean_name", &self.factory_bean_name)
            .field("factory_method_name", &self.factory_method_name)
            .field("init_method", &self.init_method)
            .field("destroy_method", &self.destroy_method)
            .field("parent_name", &self.parent_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pool;

    fn pool_class() -> Arc<BeanClass> {
        BeanClass::builder::<Pool>("Pool")
            .default_constructor(|| Pool)
            .build()
    }

    #[test]
    fn test_builder_defaults() {
        let def = BeanDefinition::of_class(pool_class());
        assert_eq!(def.scope(), Scope::Singleton);
        assert!(def.autowire_candidate);
        assert!(def.lenient_constructor_resolution);
        assert_eq!(def.class_name(), Some("Pool"));
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_merge_child_over_parent() {
        let parent = BeanDefinition::of_class(pool_class())
            .with_scope(Scope::Prototype)
            .with_property("size", 10i64)
            .with_property("name", "parent")
            .with_init_method("start")
            .with_abstract(true);
        let child = BeanDefinition::child("base")
            .with_property("name", "child")
            .with_constructor_arg("x");

        let merged = child.merge_with_parent(&parent);
        assert_eq!(merged.scope(), Scope::Prototype);
        assert!(!merged.is_abstract);
        assert_eq!(merged.class_name(), Some("Pool"));
        assert!(matches!(merged.property_values.get("size"), Some(Value::Int(10))));
        assert!(matches!(merged.property_values.get("name"), Some(Value::Str(s)) if s == "child"));
        assert_eq!(merged.constructor_args.argument_count(), 1);
        assert!(matches!(merged.init_method, Some(LifecycleCallback::Named(ref n)) if n == "start"));
        assert!(!Arc::ptr_eq(&merged.resolution, &parent.resolution));
    }

    #[test]
    fn test_validate_rejects_incomplete_definitions() {
        assert!(BeanDefinition::new().validate().is_err());
        assert!(BeanDefinition::new()
            .with_factory_bean("factory")
            .validate()
            .is_err());
        assert!(BeanDefinition::new()
            .with_factory_bean("factory")
            .with_factory_method("create")
            .validate()
            .is_ok());
        assert!(BeanDefinition::new()
            .with_class_name("Missing")
            .validate()
            .is_err());
        assert!(BeanDefinition::from_supplier(|| Ok(Pool)).validate().is_ok());
    }

    #[test]
    fn test_typed_init_callback_rejects_other_types() {
        let def = BeanDefinition::from_supplier(|| Ok(Pool)).with_init(|_: &String| Ok(()));
        let callback = match def.init_method {
            Some(LifecycleCallback::Callback(cb)) => cb,
            _ => panic!("expected closure callback"),
        };
        let bean: BeanObject = Arc::new(Pool);
        assert!(callback(&bean).is_err());
        let text: BeanObject = Arc::new("ok".to_string());
        assert!(callback(&text).is_ok());
    }
}
