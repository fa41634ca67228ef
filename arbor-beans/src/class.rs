//! Bean 类型元数据
//!
//! Rust 没有运行时反射，容器无法像 Spring 那样枚举一个类型的构造函数、工厂方法和
//! setter。`BeanClass` 把这些信息显式登记下来：每个构造函数 / 工厂方法是一个
//! `Executable`（参数描述 + 调用闭包），每个可写属性是一个 `PropertyDescriptor`。
//! `ConstructorResolver` 只依赖这些描述做参数匹配和歧义检测。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arbor_core::{ContainerError, ContainerResult};

use crate::lifecycle::{BeanFactoryPostProcessor, BeanPostProcessor};
use crate::BeanObject;

/// 取实例的实际类型 ID（不能直接对 `Arc<dyn Any>` 调用 `type_id`，那会得到 Arc 自身的类型）
pub fn instance_type_id(bean: &BeanObject) -> TypeId {
    (**bean).type_id()
}

/// 参数 / 属性的类型描述
#[derive(Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// 参数名（用于按名称匹配构造参数、按名称回退选择自动装配候选）
    pub name: Option<String>,
    /// 接受任意类型（相当于 Java 中声明为 Object 的参数）
    pub accepts_any: bool,
}

impl ParamSpec {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: None,
            accepts_any: false,
        }
    }

    /// 任意类型参数
    pub fn any() -> Self {
        Self {
            type_id: TypeId::of::<BeanObject>(),
            type_name: "any",
            name: None,
            accepts_any: true,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 实例能否直接赋值给该参数（不做转换）
    pub fn is_assignable(&self, value: &BeanObject) -> bool {
        self.accepts_any || instance_type_id(value) == self.type_id
    }

    /// 类型名匹配：完整路径或短名称（定义中 `type = "i64"` / `type = "UserService"`）
    pub fn matches_type_name(&self, type_name: &str) -> bool {
        self.type_name == type_name
            || arbor_core::utils::naming::short_type_name(self.type_name) == type_name
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}: {}", name, self.type_name),
            None => write!(f, "{}", self.type_name),
        }
    }
}

/// 解析好的调用参数
///
/// `None` 表示空值参数
#[derive(Clone, Default)]
pub struct Args {
    values: Vec<Option<BeanObject>>,
}

impl Args {
    pub fn new(values: Vec<Option<BeanObject>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn raw(&self, index: usize) -> Option<&BeanObject> {
        self.values.get(index).and_then(|v| v.as_ref())
    }

    /// 取出第 index 个参数并向下转型
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> ContainerResult<Arc<T>> {
        let value = self.raw(index).cloned().ok_or_else(|| {
            ContainerError::IllegalState(format!("Argument {} is null or missing", index))
        })?;
        value
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                bean: format!("argument {}", index),
                expected: std::any::type_name::<T>().to_string(),
                found: "incompatible argument".to_string(),
            })
    }

    /// 可空参数
    pub fn opt<T: Any + Send + Sync>(&self, index: usize) -> ContainerResult<Option<Arc<T>>> {
        match self.raw(index) {
            None => Ok(None),
            Some(_) => self.get::<T>(index).map(Some),
        }
    }

    /// 按值取出可克隆的参数（标量常用）
    pub fn value<T: Any + Send + Sync + Clone>(&self, index: usize) -> ContainerResult<T> {
        self.get::<T>(index).map(|v| (*v).clone())
    }

    pub fn into_inner(self) -> Vec<Option<BeanObject>> {
        self.values
    }
}

type Invoker = Arc<dyn Fn(Option<&BeanObject>, &Args) -> ContainerResult<BeanObject> + Send + Sync>;

/// 可执行体类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableKind {
    Constructor,
    FactoryMethod { name: String, is_static: bool },
}

/// 构造函数或工厂方法
#[derive(Clone)]
pub struct Executable {
    pub kind: ExecutableKind,
    pub declaring_class: String,
    pub params: Vec<ParamSpec>,
    /// 返回类型（构造函数即所属类型）
    pub return_type: ParamSpec,
    invoker: Invoker,
}

impl Executable {
    pub fn is_constructor(&self) -> bool {
        matches!(self.kind, ExecutableKind::Constructor)
    }

    pub fn method_name(&self) -> Option<&str> {
        match &self.kind {
            ExecutableKind::FactoryMethod { name, .. } => Some(name),
            ExecutableKind::Constructor => None,
        }
    }

    pub fn is_static(&self) -> bool {
        match &self.kind {
            ExecutableKind::FactoryMethod { is_static, .. } => *is_static,
            ExecutableKind::Constructor => true,
        }
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// 参数类型列表是否完全一致
    pub fn same_param_types(&self, other: &Executable) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(other.params.iter())
                .all(|(a, b)| a.type_id == b.type_id)
    }

    pub fn returns_unit(&self) -> bool {
        self.return_type.type_id == TypeId::of::<()>()
    }

    pub fn invoke(&self, target: Option<&BeanObject>, args: &Args) -> ContainerResult<BeanObject> {
        (self.invoker)(target, args)
    }

    pub fn kind_label(&self) -> &'static str {
        if self.is_constructor() {
            "constructor"
        } else {
            "factory method"
        }
    }
}

impl fmt::Debug for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|p| format!("{:?}", p)).collect();
        match &self.kind {
            ExecutableKind::Constructor => {
                write!(f, "{}({})", self.declaring_class, params.join(", "))
            }
            ExecutableKind::FactoryMethod { name, is_static } => write!(
                f,
                "{}{}::{}({})",
                if *is_static { "static " } else { "" },
                self.declaring_class,
                name,
                params.join(", ")
            ),
        }
    }
}

impl fmt::Display for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

type Setter = Arc<dyn Fn(&BeanObject, BeanObject) -> ContainerResult<()> + Send + Sync>;

/// 可写属性
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub param: ParamSpec,
    setter: Setter,
}

impl PropertyDescriptor {
    pub fn set(&self, bean: &BeanObject, value: BeanObject) -> ContainerResult<()> {
        (self.setter)(bean, value)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.param.type_name)
    }
}

/// Bean 实例上的回调（init / destroy / afterPropertiesSet）
pub type BeanCallback = Arc<dyn Fn(&BeanObject) -> ContainerResult<()> + Send + Sync>;

/// BeanNameAware 回调
pub type BeanNameCallback = Arc<dyn Fn(&BeanObject, &str) + Send + Sync>;

/// 把 Bean 实例视为某个扩展接口的转换函数（替代 Java 的 instanceof）
pub type BeanPostProcessorCast =
    Arc<dyn Fn(&BeanObject) -> Option<Arc<dyn BeanPostProcessor>> + Send + Sync>;
pub type BeanFactoryPostProcessorCast =
    Arc<dyn Fn(&BeanObject) -> Option<Arc<dyn BeanFactoryPostProcessor>> + Send + Sync>;

/// Bean 具备的容器接口能力
#[derive(Clone, Default)]
pub struct BeanCapabilities {
    pub bean_post_processor: Option<BeanPostProcessorCast>,
    pub bean_factory_post_processor: Option<BeanFactoryPostProcessorCast>,
    /// SmartInitializingSingleton：所有非延迟单例创建完成后回调
    pub after_singletons_instantiated: Option<BeanCallback>,
}

impl BeanCapabilities {
    pub fn is_empty(&self) -> bool {
        self.bean_post_processor.is_none()
            && self.bean_factory_post_processor.is_none()
            && self.after_singletons_instantiated.is_none()
    }

    /// 以 self 为主，缺失的能力从 fallback 补齐
    pub fn or(&self, fallback: &BeanCapabilities) -> BeanCapabilities {
        BeanCapabilities {
            bean_post_processor: self
                .bean_post_processor
                .clone()
                .or_else(|| fallback.bean_post_processor.clone()),
            bean_factory_post_processor: self
                .bean_factory_post_processor
                .clone()
                .or_else(|| fallback.bean_factory_post_processor.clone()),
            after_singletons_instantiated: self
                .after_singletons_instantiated
                .clone()
                .or_else(|| fallback.after_singletons_instantiated.clone()),
        }
    }
}

impl BeanCapabilities {
    pub fn bean_post_processor<T: BeanPostProcessor + 'static>() -> BeanPostProcessorCast {
        Arc::new(|bean: &BeanObject| {
            bean.clone()
                .downcast::<T>()
                .ok()
                .map(|p| p as Arc<dyn BeanPostProcessor>)
        })
    }

    pub fn bean_factory_post_processor<T: BeanFactoryPostProcessor + 'static>(
    ) -> BeanFactoryPostProcessorCast {
        Arc::new(|bean: &BeanObject| {
            bean.clone()
                .downcast::<T>()
                .ok()
                .map(|p| p as Arc<dyn BeanFactoryPostProcessor>)
        })
    }
}

/// 类型元数据
pub struct BeanClass {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    constructors: Vec<Executable>,
    factory_methods: Vec<Executable>,
    properties: Vec<PropertyDescriptor>,
    methods: HashMap<String, BeanCallback>,
    initializing: Option<BeanCallback>,
    disposable: Option<BeanCallback>,
    bean_name_aware: Option<BeanNameCallback>,
    capabilities: BeanCapabilities,
}

impl BeanClass {
    /// 以类型 T 开始构建元数据，`name` 是定义中引用该类型使用的类名
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> BeanClassBuilder<T> {
        BeanClassBuilder {
            class: BeanClass {
                name: name.into(),
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                constructors: Vec::new(),
                factory_methods: Vec::new(),
                properties: Vec::new(),
                methods: HashMap::new(),
                initializing: None,
                disposable: None,
                bean_name_aware: None,
                capabilities: BeanCapabilities::default(),
            },
            _marker: std::marker::PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 描述的类型（不要与 `Any::type_id` 混淆，后者是元数据自身的类型）
    pub fn bean_type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn constructors(&self) -> &[Executable] {
        &self.constructors
    }

    pub fn default_constructor(&self) -> Option<&Executable> {
        self.constructors.iter().find(|c| c.params.is_empty())
    }

    /// 指定名称（及静态性）的工厂方法候选
    pub fn factory_methods_named(&self, name: &str, is_static: bool) -> Vec<Executable> {
        self.factory_methods
            .iter()
            .filter(|m| m.method_name() == Some(name) && m.is_static() == is_static)
            .cloned()
            .collect()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn method(&self, name: &str) -> Option<&BeanCallback> {
        self.methods.get(name)
    }

    pub fn initializing_callback(&self) -> Option<&BeanCallback> {
        self.initializing.as_ref()
    }

    pub fn disposable_callback(&self) -> Option<&BeanCallback> {
        self.disposable.as_ref()
    }

    pub fn bean_name_aware(&self) -> Option<&BeanNameCallback> {
        self.bean_name_aware.as_ref()
    }

    pub fn capabilities(&self) -> &BeanCapabilities {
        &self.capabilities
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanClass")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("constructors", &self.constructors)
            .field("factory_methods", &self.factory_methods)
            .field("properties", &self.properties)
            .finish()
    }
}

fn downcast_target<T: Any + Send + Sync>(bean: &BeanObject) -> ContainerResult<&T> {
    (**bean)
        .downcast_ref::<T>()
        .ok_or_else(|| ContainerError::TypeMismatch {
            bean: "target".to_string(),
            expected: std::any::type_name::<T>().to_string(),
            found: "incompatible instance".to_string(),
        })
}

/// `BeanClass` 构建器，闭包直接操作具体类型 T
pub struct BeanClassBuilder<T> {
    class: BeanClass,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> BeanClassBuilder<T> {
    fn return_spec() -> ParamSpec {
        ParamSpec::of::<T>()
    }

    /// 登记构造函数
    pub fn constructor<F>(mut self, params: Vec<ParamSpec>, f: F) -> Self
    where
        F: Fn(&Args) -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.class.constructors.push(Executable {
            kind: ExecutableKind::Constructor,
            declaring_class: self.class.name.clone(),
            params,
            return_type: Self::return_spec(),
            invoker: Arc::new(move |_, args| Ok(Arc::new(f(args)?) as BeanObject)),
        });
        self
    }

    /// 登记无参构造函数
    pub fn default_constructor<F>(self, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor(Vec::new(), move |_| Ok(f()))
    }

    /// 登记静态工厂方法，返回类型 R 可以与 T 不同
    pub fn static_factory<R, F>(mut self, name: impl Into<String>, params: Vec<ParamSpec>, f: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&Args) -> ContainerResult<R> + Send + Sync + 'static,
    {
        self.class.factory_methods.push(Executable {
            kind: ExecutableKind::FactoryMethod {
                name: name.into(),
                is_static: true,
            },
            declaring_class: self.class.name.clone(),
            params,
            return_type: ParamSpec::of::<R>(),
            invoker: Arc::new(move |_, args| Ok(Arc::new(f(args)?) as BeanObject)),
        });
        self
    }

    /// 登记实例工厂方法（在工厂 Bean 实例上调用）
    pub fn instance_factory<R, F>(
        mut self,
        name: impl Into<String>,
        params: Vec<ParamSpec>,
        f: F,
    ) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&T, &Args) -> ContainerResult<R> + Send + Sync + 'static,
    {
        self.class.factory_methods.push(Executable {
            kind: ExecutableKind::FactoryMethod {
                name: name.into(),
                is_static: false,
            },
            declaring_class: self.class.name.clone(),
            params,
            return_type: ParamSpec::of::<R>(),
            invoker: Arc::new(move |target, args| {
                let target = target.ok_or_else(|| {
                    ContainerError::IllegalState("Instance factory method invoked without target".to_string())
                })?;
                Ok(Arc::new(f(downcast_target::<T>(target)?, args)?) as BeanObject)
            }),
        });
        self
    }

    /// 登记可写属性，值类型为 V
    pub fn property<V, F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T, Arc<V>) -> ContainerResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let param = ParamSpec::of::<V>().named(name.clone());
        self.class.properties.push(PropertyDescriptor {
            name,
            param,
            setter: Arc::new(move |bean, value| {
                let value = value.downcast::<V>().map_err(|_| ContainerError::TypeMismatch {
                    bean: "property value".to_string(),
                    expected: std::any::type_name::<V>().to_string(),
                    found: "incompatible value".to_string(),
                })?;
                setter(downcast_target::<T>(bean)?, value)
            }),
        });
        self
    }

    /// 登记可按名称引用的无参方法（init-method / destroy-method）
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.class
            .methods
            .insert(name.into(), Arc::new(move |bean| f(downcast_target::<T>(bean)?)));
        self
    }

    /// InitializingBean.afterPropertiesSet
    pub fn initializing_bean<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.class.initializing = Some(Arc::new(move |bean| f(downcast_target::<T>(bean)?)));
        self
    }

    /// DisposableBean.destroy
    pub fn disposable_bean<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.class.disposable = Some(Arc::new(move |bean| f(downcast_target::<T>(bean)?)));
        self
    }

    /// BeanNameAware.setBeanName
    pub fn bean_name_aware<F>(mut self, f: F) -> Self
    where
        F: Fn(&T, &str) + Send + Sync + 'static,
    {
        self.class.bean_name_aware = Some(Arc::new(move |bean, name| {
            if let Some(target) = (**bean).downcast_ref::<T>() {
                f(target, name);
            }
        }));
        self
    }

    /// SmartInitializingSingleton.afterSingletonsInstantiated
    pub fn after_singletons_instantiated<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.class.capabilities.after_singletons_instantiated =
            Some(Arc::new(move |bean| f(downcast_target::<T>(bean)?)));
        self
    }

    pub fn build(self) -> Arc<BeanClass> {
        Arc::new(self.class)
    }
}

impl<T: BeanPostProcessor + 'static> BeanClassBuilder<T> {
    /// 标记该类型的 Bean 是 BeanPostProcessor
    pub fn bean_post_processor(mut self) -> Self {
        self.class.capabilities.bean_post_processor =
            Some(BeanCapabilities::bean_post_processor::<T>());
        self
    }
}

impl<T: BeanFactoryPostProcessor + 'static> BeanClassBuilder<T> {
    /// 标记该类型的 Bean 是 BeanFactoryPostProcessor
    pub fn bean_factory_post_processor(mut self) -> Self {
        self.class.capabilities.bean_factory_post_processor =
            Some(BeanCapabilities::bean_factory_post_processor::<T>());
        self
    }
}

/// 类名 -> 类型元数据
///
/// 定义读取器通过它把 `class = "..."` 解析成 `BeanClass`
#[derive(Default, Clone)]
pub struct ClassRegistry {
    classes: HashMap<String, Arc<BeanClass>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: Arc<BeanClass>) -> &mut Self {
        self.classes.insert(class.name().to_string(), class);
        self
    }

    pub fn with(mut self, class: Arc<BeanClass>) -> Self {
        self.register(class);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<BeanClass>> {
        self.classes.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &Arc<BeanClass>> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeter {
        greeting: String,
    }

    fn greeter_class() -> Arc<BeanClass> {
        BeanClass::builder::<Greeter>("Greeter")
            .default_constructor(|| Greeter {
                greeting: "hello".to_string(),
            })
            .constructor(vec![ParamSpec::of::<String>().named("greeting")], |args| {
                Ok(Greeter {
                    greeting: args.value::<String>(0)?,
                })
            })
            .static_factory::<String, _>("describe", vec![], |_| Ok("greeter".to_string()))
            .instance_factory::<usize, _>("length", vec![], |g: &Greeter, _| Ok(g.greeting.len()))
            .build()
    }

    #[test]
    fn test_constructor_invocation() {
        let class = greeter_class();
        assert_eq!(class.constructors().len(), 2);
        assert!(class.default_constructor().is_some());

        let ctor = &class.constructors()[1];
        let args = Args::new(vec![Some(Arc::new("hi".to_string()) as BeanObject)]);
        let bean = ctor.invoke(None, &args).unwrap();
        assert_eq!(bean.downcast_ref::<Greeter>().unwrap().greeting, "hi");
        assert_eq!(instance_type_id(&bean), TypeId::of::<Greeter>());
    }

    #[test]
    fn test_factory_method_lookup_respects_static_flag() {
        let class = greeter_class();
        assert_eq!(class.factory_methods_named("describe", true).len(), 1);
        assert!(class.factory_methods_named("describe", false).is_empty());

        let length = class.factory_methods_named("length", false).remove(0);
        let target: BeanObject = Arc::new(Greeter {
            greeting: "four".to_string(),
        });
        let result = length.invoke(Some(&target), &Args::default()).unwrap();
        assert_eq!(*result.downcast::<usize>().unwrap(), 4);
        assert!(length.invoke(None, &Args::default()).is_err());
    }

    #[test]
    fn test_args_type_mismatch() {
        let args = Args::new(vec![Some(Arc::new(5i64) as BeanObject), None]);
        assert!(args.get::<String>(0).is_err());
        assert_eq!(args.value::<i64>(0).unwrap(), 5);
        assert!(args.opt::<String>(1).unwrap().is_none());
        assert!(args.get::<String>(1).is_err());
    }

    #[test]
    fn test_param_spec_type_name_matching() {
        let spec = ParamSpec::of::<Greeter>();
        assert!(spec.matches_type_name("Greeter"));
        assert!(spec.matches_type_name(std::any::type_name::<Greeter>()));
        assert!(!spec.matches_type_name("Other"));
        assert!(ParamSpec::of::<i64>().matches_type_name("i64"));
    }
}
