//! Bean Factory - 核心容器接口
//!
//! 参考 Spring 的 BeanFactory 架构设计：
//! - `BeanFactory`：按名称取 Bean，最基础的接口（可以作为 trait object）
//! - `BeanFactoryExt`：泛型方法，按类型取 Bean
//! - `ListableBeanFactory`：列举定义、按类型查找名称
//! - `ConfigurableBeanFactory`：后置处理器、内嵌值解析器、依赖关系、单例注册
//! - `ConfigurableListableBeanFactory`：预实例化、冻结配置、销毁
//! - `BeanDefinitionRegistry`：注册 / 移除定义
//! - `AutowireCapableBeanFactory`：按类型解析依赖
//!
//! `DefaultListableBeanFactory` 是它们的默认实现。

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;

use arbor_core::{AliasRegistry, ContainerError, ContainerResult, Environment, StringValueResolver};

use crate::class::{instance_type_id, BeanCapabilities, BeanClass, Executable, ParamSpec};
use crate::constructor::ConstructorResolver;
use crate::definition::{AutowireMode, BeanDefinition, LifecycleCallback};
use crate::lifecycle::{BeanPostProcessor, DisposableBean, DisposableBeanAdapter};
use crate::singleton::DefaultSingletonBeanRegistry;
use crate::tracker::CreationTracker;
use crate::value::{PropertyValues, TypeConverter, Value};
use crate::value_resolver::BeanDefinitionValueResolver;
use crate::BeanObject;

/// BeanFactory - 最基础的容器接口
///
/// 此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称（或别名）获取 Bean
    fn get_bean(&self, name: &str) -> ContainerResult<BeanObject>;

    /// 使用显式参数创建 Bean（原型或工厂方法）
    fn get_bean_with_args(
        &self,
        name: &str,
        args: Vec<Option<BeanObject>>,
    ) -> ContainerResult<BeanObject>;

    /// 检查是否包含指定名称的 Bean（定义或手动注册的单例）
    fn contains_bean(&self, name: &str) -> bool;

    fn is_singleton(&self, name: &str) -> ContainerResult<bool>;

    fn is_prototype(&self, name: &str) -> ContainerResult<bool>;

    /// Bean 的类型，无法确定时返回 None
    fn get_type(&self, name: &str) -> ContainerResult<Option<TypeId>>;
}

/// BeanFactoryExt - BeanFactory 的扩展 trait
///
/// 提供泛型方法，不能作为 trait object 使用
pub trait BeanFactoryExt: BeanFactory {
    /// 按名称获取并向下转型
    fn get_bean_of<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>>;

    /// 通过类型获取唯一的 Bean（多个候选时取 primary）
    fn get_bean_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>>;

    /// 获取指定类型的所有 Bean，按注册顺序
    fn get_beans_of_type<T: Any + Send + Sync>(&self) -> ContainerResult<Vec<(String, Arc<T>)>>;

    /// 检查是否包含指定类型的 Bean
    fn contains_bean_by_type<T: Any + Send + Sync>(&self) -> bool;
}

/// ListableBeanFactory - 可列举的 Bean 工厂
pub trait ListableBeanFactory: BeanFactory {
    fn contains_bean_definition(&self, name: &str) -> bool;

    fn get_bean_definition_count(&self) -> usize;

    /// 所有定义名称，按注册顺序
    fn get_bean_definition_names(&self) -> Vec<String>;

    /// 获取指定类型的所有 Bean 名称（包括手动注册的单例）
    fn get_bean_names_for_type(&self, type_id: TypeId) -> Vec<String>;
}

/// ConfigurableBeanFactory - 可配置的 Bean 工厂
pub trait ConfigurableBeanFactory: BeanFactory {
    /// 添加 BeanPostProcessor，已存在时移到末尾
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>>;

    fn get_bean_post_processor_count(&self) -> usize;

    /// 添加内嵌值解析器（例如占位符）
    fn add_embedded_value_resolver(&self, resolver: Arc<dyn StringValueResolver>);

    fn has_embedded_value_resolver(&self) -> bool;

    /// 依次用所有内嵌值解析器解析字符串
    ///
    /// 任一解析器返回 `None`（例如命中 null 值）时结果为 `None`
    fn resolve_embedded_value(&self, value: &str) -> ContainerResult<Option<String>>;

    /// 注册外部创建好的单例
    fn register_singleton(&self, name: &str, singleton: BeanObject) -> ContainerResult<()>;

    /// 记录 dependent 依赖 bean，销毁 bean 之前先销毁 dependent
    fn register_dependent_bean(&self, bean: &str, dependent: &str);

    fn get_dependent_beans(&self, name: &str) -> Vec<String>;

    fn get_dependencies_for_bean(&self, name: &str) -> Vec<String>;

    /// 合并父定义后的定义
    fn get_merged_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>>;

    fn is_currently_in_creation(&self, name: &str) -> bool;

    /// 销毁单个单例（及依赖它的 Bean）
    fn destroy_singleton(&self, name: &str);

    /// 按定义销毁一个（原型）实例
    fn destroy_bean(&self, name: &str, bean: BeanObject) -> ContainerResult<()>;
}

/// ConfigurableListableBeanFactory - 可配置且可列举的 Bean 工厂
///
/// 这是 BeanFactoryPostProcessor 接收的参数类型
pub trait ConfigurableListableBeanFactory: ListableBeanFactory + ConfigurableBeanFactory {
    /// 预实例化所有非延迟单例 Bean
    fn preinstantiate_singletons(&self) -> ContainerResult<()>;

    /// 冻结配置（不再允许修改 Bean 定义）
    fn freeze_configuration(&self);

    fn is_configuration_frozen(&self) -> bool;

    /// 销毁所有单例 Bean（调用 destroy 回调）
    fn destroy_singletons(&self);
}

/// BeanDefinitionRegistry - 定义注册表
pub trait BeanDefinitionRegistry {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()>;

    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()>;

    /// 获取注册的原始定义（未合并）
    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition>;

    /// 名称是否已被定义、单例、别名或依赖关系占用
    fn is_bean_name_in_use(&self, name: &str) -> bool;
}

/// AutowireCapableBeanFactory - 自动装配
pub trait AutowireCapableBeanFactory: BeanFactory {
    /// 按类型解析一个依赖
    ///
    /// `autowired_bean_names` 收集被选中的 Bean 名称，调用方据此记录依赖关系
    fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting_bean_name: Option<&str>,
        autowired_bean_names: Option<&mut Vec<String>>,
    ) -> ContainerResult<Option<BeanObject>>;

    fn apply_bean_post_processors_before_initialization(
        &self,
        bean: BeanObject,
        name: &str,
    ) -> ContainerResult<BeanObject>;

    fn apply_bean_post_processors_after_initialization(
        &self,
        bean: BeanObject,
        name: &str,
    ) -> ContainerResult<BeanObject>;
}

/// 一个待注入的依赖
#[derive(Debug, Clone)]
pub struct DependencyDescriptor {
    pub param: ParamSpec,
    pub required: bool,
}

impl DependencyDescriptor {
    pub fn new(param: ParamSpec, required: bool) -> Self {
        Self { param, required }
    }

    pub fn of<T: Any>(required: bool) -> Self {
        Self::new(ParamSpec::of::<T>(), required)
    }

    /// 参数名 / 属性名，多个候选时按名称回退
    pub fn dependency_name(&self) -> Option<&str> {
        self.param.name.as_deref()
    }
}

/// 工厂行为配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FactoryConfig {
    /// 是否允许同名定义覆盖
    pub allow_bean_definition_overriding: bool,

    /// 是否通过提前暴露解决单例之间的循环引用
    pub allow_circular_references: bool,

    /// 原始实例已被注入其他 Bean、之后又被包装时是否仍然接受
    pub allow_raw_injection_despite_wrapping: bool,

    /// 为 false 时所有定义都按严格模式解析构造函数
    pub lenient_constructor_resolution: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            allow_bean_definition_overriding: true,
            allow_circular_references: true,
            allow_raw_injection_despite_wrapping: false,
            lenient_constructor_resolution: true,
        }
    }
}

impl FactoryConfig {
    /// 从 TOML 文本读取，缺省字段取默认值
    pub fn from_toml_str(content: &str) -> ContainerResult<Self> {
        toml::from_str(content)
            .map_err(|e| ContainerError::Config(format!("Invalid factory configuration: {}", e)))
    }

    /// 从 Environment 读取 `arbor.factory.*`
    pub fn from_environment(env: &Environment) -> Self {
        let defaults = Self::default();
        Self {
            allow_bean_definition_overriding: env.get_bool_or(
                "arbor.factory.allow-bean-definition-overriding",
                defaults.allow_bean_definition_overriding,
            ),
            allow_circular_references: env.get_bool_or(
                "arbor.factory.allow-circular-references",
                defaults.allow_circular_references,
            ),
            allow_raw_injection_despite_wrapping: env.get_bool_or(
                "arbor.factory.allow-raw-injection-despite-wrapping",
                defaults.allow_raw_injection_despite_wrapping,
            ),
            lenient_constructor_resolution: env.get_bool_or(
                "arbor.factory.lenient-constructor-resolution",
                defaults.lenient_constructor_resolution,
            ),
        }
    }
}

/// 不参与按名称 / 按类型自动装配的简单属性类型
fn is_simple_property(param: &ParamSpec) -> bool {
    let simple = [
        TypeId::of::<String>(),
        TypeId::of::<bool>(),
        TypeId::of::<char>(),
        TypeId::of::<i64>(),
        TypeId::of::<i32>(),
        TypeId::of::<i16>(),
        TypeId::of::<i8>(),
        TypeId::of::<u64>(),
        TypeId::of::<u32>(),
        TypeId::of::<u16>(),
        TypeId::of::<u8>(),
        TypeId::of::<usize>(),
        TypeId::of::<isize>(),
        TypeId::of::<f64>(),
        TypeId::of::<f32>(),
        TypeId::of::<Vec<String>>(),
        TypeId::of::<Vec<i64>>(),
        TypeId::of::<Vec<BeanObject>>(),
    ];
    param.accepts_any || simple.contains(&param.type_id)
}

/// 依次应用 SmartInstantiationAwareBeanPostProcessor 得到早期引用
fn early_bean_reference(
    bean: BeanObject,
    name: &str,
    processors: &[Arc<dyn BeanPostProcessor>],
) -> ContainerResult<BeanObject> {
    let mut exposed = bean;
    for processor in processors {
        if let Some(smart) = processor.as_smart_instantiation_aware() {
            exposed = smart.get_early_bean_reference(exposed, name)?;
        }
    }
    Ok(exposed)
}

/// 错误所属的 Bean 名称
fn failing_bean(error: &ContainerError) -> Option<&str> {
    match error {
        ContainerError::BeanCreation { bean, .. }
        | ContainerError::BeanCurrentlyInCreation { bean, .. }
        | ContainerError::UnsatisfiedDependency { bean, .. }
        | ContainerError::BeanCreationNotAllowed { bean, .. } => Some(bean.as_str()),
        _ => None,
    }
}

/// DefaultListableBeanFactory - ConfigurableListableBeanFactory 的默认实现
pub struct DefaultListableBeanFactory {
    /// 单例缓存、别名、依赖关系、销毁
    registry: DefaultSingletonBeanRegistry,

    config: RwLock<FactoryConfig>,

    /// Bean 定义存储
    bean_definitions: RwLock<HashMap<String, BeanDefinition>>,

    /// 定义名称，按注册顺序
    bean_definition_names: RwLock<Vec<String>>,

    /// 手动注册（没有定义）的单例名称
    manual_singleton_names: RwLock<Vec<String>>,

    /// 合并后的定义缓存，同时承载构造函数解析缓存
    merged_definitions: RwLock<HashMap<String, Arc<BeanDefinition>>>,

    /// 至少创建过一次的 Bean
    already_created: RwLock<HashSet<String>>,

    /// Bean 后置处理器列表
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,

    embedded_value_resolvers: RwLock<Vec<Arc<dyn StringValueResolver>>>,

    /// 当前线程正在创建的原型
    prototypes_in_creation: CreationTracker,

    /// 当前线程正在合并的定义（检测父定义循环）
    definitions_in_merge: CreationTracker,

    /// 正在预测类型的 Bean（工厂 Bean 互相引用时终止递归）
    types_in_prediction: CreationTracker,

    /// 类型 ID -> 元数据，用于实例类型与定义类型不同的情况（工厂方法）
    classes_by_type: RwLock<HashMap<TypeId, Arc<BeanClass>>>,

    /// 配置是否已冻结
    configuration_frozen: AtomicBool,

    type_converter: TypeConverter,
}

impl Default for DefaultListableBeanFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new() -> Self {
        Self::with_config(FactoryConfig::default())
    }

    pub fn with_config(config: FactoryConfig) -> Self {
        Self {
            registry: DefaultSingletonBeanRegistry::new(),
            config: RwLock::new(config),
            bean_definitions: RwLock::new(HashMap::new()),
            bean_definition_names: RwLock::new(Vec::new()),
            manual_singleton_names: RwLock::new(Vec::new()),
            merged_definitions: RwLock::new(HashMap::new()),
            already_created: RwLock::new(HashSet::new()),
            bean_post_processors: RwLock::new(Vec::new()),
            embedded_value_resolvers: RwLock::new(Vec::new()),
            prototypes_in_creation: CreationTracker::new(),
            definitions_in_merge: CreationTracker::new(),
            types_in_prediction: CreationTracker::new(),
            classes_by_type: RwLock::new(HashMap::new()),
            configuration_frozen: AtomicBool::new(false),
            type_converter: TypeConverter::new(),
        }
    }

    pub fn config(&self) -> FactoryConfig {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: FactoryConfig) {
        *self.config.write() = config;
        self.merged_definitions.write().clear();
    }

    pub fn set_allow_bean_definition_overriding(&self, allow: bool) {
        self.config.write().allow_bean_definition_overriding = allow;
    }

    pub fn set_allow_circular_references(&self, allow: bool) {
        self.config.write().allow_circular_references = allow;
    }

    pub fn set_allow_raw_injection_despite_wrapping(&self, allow: bool) {
        self.config.write().allow_raw_injection_despite_wrapping = allow;
    }

    /// 底层单例注册表
    pub fn singleton_registry(&self) -> &DefaultSingletonBeanRegistry {
        &self.registry
    }

    pub fn type_converter(&self) -> TypeConverter {
        self.type_converter
    }

    /// 登记类型元数据，用于按实例类型查找 setter 和回调
    pub fn register_class(&self, class: Arc<BeanClass>) {
        self.classes_by_type
            .write()
            .entry(class.bean_type_id())
            .or_insert(class);
    }

    pub fn class_for_type(&self, type_id: TypeId) -> Option<Arc<BeanClass>> {
        self.classes_by_type.read().get(&type_id).cloned()
    }

    /// 实例实际类型的元数据
    pub fn class_for_instance(&self, bean: &BeanObject) -> Option<Arc<BeanClass>> {
        self.class_for_type(instance_type_id(bean))
    }

    /// 某个 Bean（不触发创建）的类型元数据
    pub fn class_of_bean(&self, name: &str) -> Option<Arc<BeanClass>> {
        let bean_name = self.transformed_bean_name(name);
        if let Ok(Some(singleton)) = self.registry.get_singleton(&bean_name, false) {
            if let Some(class) = self.class_for_instance(&singleton) {
                return Some(class);
            }
        }
        let mbd = self.get_merged_bean_definition(&bean_name).ok()?;
        match self.predict_bean_type(&bean_name, &mbd) {
            Some(type_id) => self.class_for_type(type_id).or_else(|| mbd.bean_class.clone()),
            None => mbd.bean_class.clone(),
        }
    }

    /// 与实例类型一致的元数据：优先使用定义上的类型
    fn class_for_bean(&self, mbd: &BeanDefinition, bean: &BeanObject) -> Option<Arc<BeanClass>> {
        let type_id = instance_type_id(bean);
        match &mbd.bean_class {
            Some(class) if class.bean_type_id() == type_id => Some(class.clone()),
            _ => self.class_for_type(type_id),
        }
    }

    /// Bean 声明的容器接口能力（定义 + 预测类型上的元数据）
    pub fn capabilities_of(&self, name: &str) -> ContainerResult<BeanCapabilities> {
        let bean_name = self.transformed_bean_name(name);
        if !self.contains_bean_definition(&bean_name) {
            return Ok(self
                .registry
                .get_singleton(&bean_name, false)?
                .and_then(|bean| self.class_for_instance(&bean))
                .map(|class| class.capabilities().clone())
                .unwrap_or_default());
        }
        let mbd = self.get_merged_bean_definition(&bean_name)?;
        let own = mbd.effective_capabilities();
        let predicted = self
            .predict_bean_type(&bean_name, &mbd)
            .and_then(|type_id| self.class_for_type(type_id));
        Ok(match predicted {
            Some(class) => own.or(class.capabilities()),
            None => own,
        })
    }

    /// 去掉别名，得到规范名称
    pub fn transformed_bean_name(&self, name: &str) -> String {
        self.registry.canonical_name(name)
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.registry.contains_singleton(name)
    }

    pub fn get_singleton_names(&self) -> Vec<String> {
        self.registry.singleton_names()
    }

    pub fn get_singleton_count(&self) -> usize {
        self.registry.singleton_count()
    }

    pub fn on_suppressed_error(&self, error: &ContainerError) {
        self.registry.on_suppressed_error(error);
    }

    pub fn register_contained_bean(&self, contained: &str, containing: &str) {
        self.registry.register_contained_bean(contained, containing);
    }

    /// 修改已注册的定义，清除其合并缓存
    pub fn modify_bean_definition<F>(&self, name: &str, modifier: F) -> ContainerResult<()>
    where
        F: FnOnce(&mut BeanDefinition),
    {
        if self.is_configuration_frozen() {
            return Err(ContainerError::ConfigurationFrozen(format!(
                "modify bean definition '{}'",
                name
            )));
        }
        {
            let mut definitions = self.bean_definitions.write();
            let definition = definitions
                .get_mut(name)
                .ok_or_else(|| ContainerError::NoSuchBeanDefinition(name.to_string()))?;
            modifier(definition);
            if let Some(class) = &definition.bean_class {
                self.register_class(class.clone());
            }
        }
        self.clear_merged_bean_definition(name);
        Ok(())
    }

    /// 对所有定义执行修改（占位符解析等）
    pub fn modify_bean_definitions<F>(&self, mut modifier: F) -> ContainerResult<()>
    where
        F: FnMut(&str, &mut BeanDefinition) -> ContainerResult<()>,
    {
        let names = self.get_bean_definition_names();
        for name in &names {
            self.modify_bean_definition_checked(name, &mut modifier)?;
        }
        Ok(())
    }

    fn modify_bean_definition_checked<F>(&self, name: &str, modifier: &mut F) -> ContainerResult<()>
    where
        F: FnMut(&str, &mut BeanDefinition) -> ContainerResult<()>,
    {
        // 在副本上修改，失败时原定义不变
        let mut definition = self.get_bean_definition(name)?;
        modifier(name, &mut definition)?;
        self.modify_bean_definition(name, |existing| *existing = definition)
    }

    /// 对别名执行值解析
    pub fn resolve_aliases(&self, resolver: &dyn StringValueResolver) -> ContainerResult<()> {
        self.registry.aliases().resolve_aliases(resolver)
    }

    fn clear_merged_bean_definition(&self, name: &str) {
        self.merged_definitions.write().remove(name);
    }

    /// 重置定义：清除合并缓存，销毁已创建的单例，子定义一并重置
    fn reset_bean_definition(&self, name: &str) {
        self.clear_merged_bean_definition(name);
        self.destroy_singleton(name);

        let children: Vec<String> = self
            .bean_definitions
            .read()
            .iter()
            .filter(|(child, def)| {
                child.as_str() != name
                    && def
                        .parent_name
                        .as_deref()
                        .map_or(false, |parent| self.transformed_bean_name(parent) == name)
            })
            .map(|(child, _)| child.clone())
            .collect();
        for child in &children {
            self.reset_bean_definition(child);
        }
    }

    /// 合并定义（不写入缓存），内部 Bean 也经由这里
    pub(crate) fn merge_bean_definition(&self, definition: &BeanDefinition) -> ContainerResult<BeanDefinition> {
        self.merge_bean_definition_named(None, definition)
    }

    fn merge_bean_definition_named(
        &self,
        bean_name: Option<&str>,
        definition: &BeanDefinition,
    ) -> ContainerResult<BeanDefinition> {
        let mut merged = match &definition.parent_name {
            None => definition.to_merged(),
            Some(parent_name) => {
                let parent_name = self.transformed_bean_name(parent_name);
                let display_name = bean_name.unwrap_or("(inner bean)").to_string();
                if bean_name == Some(parent_name.as_str())
                    || self.definitions_in_merge.is_creating(&parent_name)
                {
                    return Err(ContainerError::BeanDefinitionStore {
                        bean: display_name,
                        message: format!(
                            "Parent name '{}' refers back to the bean being merged: circular parent relationship",
                            parent_name
                        ),
                    });
                }
                let parent = self.get_merged_bean_definition(&parent_name).map_err(|e| match e {
                    ContainerError::NoSuchBeanDefinition(_) => ContainerError::BeanDefinitionStore {
                        bean: display_name.clone(),
                        message: format!("Could not resolve parent bean definition '{}'", parent_name),
                    },
                    other => other,
                })?;
                definition.merge_with_parent(&parent)
            }
        };
        if !self.config.read().lenient_constructor_resolution {
            merged.lenient_constructor_resolution = false;
        }
        if let Some(class) = &merged.bean_class {
            self.register_class(class.clone());
        }
        Ok(merged)
    }

    fn mark_bean_as_created(&self, name: &str) {
        if !self.already_created.read().contains(name) {
            self.already_created.write().insert(name.to_string());
        }
    }

    /// 是否已经开始创建 Bean
    pub fn has_bean_creation_started(&self) -> bool {
        !self.already_created.read().is_empty()
    }

    fn is_autowire_candidate(&self, name: &str) -> bool {
        match self.get_merged_bean_definition(name) {
            Ok(mbd) => mbd.autowire_candidate && !mbd.is_abstract,
            // 手动注册的单例总是候选
            Err(_) => self.contains_singleton(name),
        }
    }

    fn is_primary(&self, name: &str) -> bool {
        self.get_merged_bean_definition(name)
            .map_or(false, |mbd| mbd.primary)
    }

    /// 自引用：请求方自己，或者请求方是候选的工厂 Bean
    fn is_self_reference(&self, requesting: Option<&str>, candidate: &str) -> bool {
        let requesting = match requesting {
            Some(requesting) => requesting,
            None => return false,
        };
        requesting == candidate
            || self
                .get_merged_bean_definition(candidate)
                .map_or(false, |mbd| mbd.factory_bean_name.as_deref() == Some(requesting))
    }

    /// 多个候选时选出一个：唯一的 primary，其次按依赖名称匹配名称或别名
    fn determine_autowire_candidate(
        &self,
        candidates: &[String],
        descriptor: &DependencyDescriptor,
    ) -> ContainerResult<Option<String>> {
        let primaries: Vec<&String> = candidates.iter().filter(|c| self.is_primary(c)).collect();
        match primaries.len() {
            0 => {}
            1 => return Ok(Some(primaries[0].clone())),
            _ => {
                return Err(ContainerError::NoUniqueBeanDefinition {
                    type_name: descriptor.param.type_name.to_string(),
                    candidates: primaries.into_iter().cloned().collect(),
                })
            }
        }
        if let Some(dependency_name) = descriptor.dependency_name() {
            for candidate in candidates {
                if candidate == dependency_name
                    || AliasRegistry::get_aliases(self, candidate)
                        .iter()
                        .any(|alias| alias == dependency_name)
                {
                    return Ok(Some(candidate.clone()));
                }
            }
        }
        Ok(None)
    }

    fn find_autowire_candidates(&self, requesting: Option<&str>, param: &ParamSpec) -> Vec<String> {
        let names = if param.accepts_any {
            let mut all = self.get_bean_definition_names();
            all.extend(self.manual_singleton_names.read().iter().cloned());
            all
        } else {
            self.get_bean_names_for_type(param.type_id)
        };
        names
            .into_iter()
            .filter(|candidate| {
                !self.is_self_reference(requesting, candidate) && self.is_autowire_candidate(candidate)
            })
            .collect()
    }

    /// 预测 Bean 的类型，不触发创建
    ///
    /// 已有单例时取实例类型；否则依次看提供函数、工厂方法返回类型、类型元数据
    fn predict_bean_type(&self, name: &str, mbd: &BeanDefinition) -> Option<TypeId> {
        if let Ok(Some(singleton)) = self.registry.get_singleton(name, false) {
            return Some(instance_type_id(&singleton));
        }
        if let Some(supplier) = &mbd.instance_supplier {
            return Some(supplier.type_id);
        }
        if mbd.factory_method_name.is_some() {
            if self.types_in_prediction.is_creating(name) {
                return None;
            }
            let _predicting = self.types_in_prediction.guard(name);
            return self
                .factory_method_for_introspection(mbd)
                .map(|method| method.return_type.type_id);
        }
        mbd.bean_class.as_ref().map(|class| class.bean_type_id())
    }

    fn factory_method_for_introspection(&self, mbd: &BeanDefinition) -> Option<Executable> {
        if let Some(method) = mbd.factory_method_to_introspect() {
            return Some(method);
        }
        ConstructorResolver::new(self).resolve_factory_method_if_possible(mbd);
        mbd.factory_method_to_introspect()
    }

    fn do_get_bean(
        &self,
        name: &str,
        explicit_args: Option<&[Option<BeanObject>]>,
    ) -> ContainerResult<BeanObject> {
        let bean_name = self.transformed_bean_name(name);

        // 先查单例缓存（包括提前暴露的早期引用）
        if explicit_args.is_none() {
            if let Some(shared) = self.registry.get_singleton(&bean_name, true)? {
                if self.registry.is_singleton_currently_in_creation(&bean_name) {
                    tracing::trace!(
                        "Returning eagerly cached instance of singleton bean '{}' that is not fully initialized yet - a consequence of a circular reference",
                        bean_name
                    );
                } else {
                    tracing::trace!("Returning cached instance of singleton bean '{}'", bean_name);
                }
                return Ok(shared);
            }
        }

        if self.prototypes_in_creation.is_creating(&bean_name) {
            return Err(ContainerError::BeanCurrentlyInCreation {
                bean: bean_name,
                message: "Requested bean is currently in creation: Is there an unresolvable circular reference?".to_string(),
            });
        }

        let mbd = self.get_merged_bean_definition(&bean_name)?;
        if mbd.is_abstract {
            return Err(ContainerError::BeanIsAbstract(bean_name));
        }
        self.mark_bean_as_created(&bean_name);

        // 保证 depends-on 的 Bean 先初始化
        for dependency in &mbd.depends_on {
            if self.registry.is_dependent(&bean_name, dependency) {
                return Err(ContainerError::creation(
                    &bean_name,
                    format!(
                        "Circular depends-on relationship between '{}' and '{}'",
                        bean_name, dependency
                    ),
                ));
            }
            self.registry.register_dependent_bean(dependency, &bean_name);
            self.get_bean(dependency).map_err(|e| match e {
                ContainerError::NoSuchBeanDefinition(_) => ContainerError::creation_caused_by(
                    &bean_name,
                    format!("'{}' depends on missing bean '{}'", bean_name, dependency),
                    e,
                ),
                other => other,
            })?;
        }

        if mbd.is_singleton() {
            self.registry.get_or_create_singleton(&bean_name, || {
                self.create_bean(&bean_name, &mbd, explicit_args.map(|args| args.to_vec()))
                    .map_err(|e| {
                        // 隐式注册的单例由注册表接管，不能清除
                        let implicitly_registered = matches!(e, ContainerError::IllegalState(_))
                            && self.registry.contains_singleton(&bean_name);
                        if !implicitly_registered {
                            // 清除可能已经提前暴露的引用
                            self.destroy_singleton(&bean_name);
                        }
                        e
                    })
            })
        } else {
            let _guard = self.prototypes_in_creation.guard(&bean_name);
            self.create_bean(&bean_name, &mbd, explicit_args.map(|args| args.to_vec()))
        }
    }

    /// 按合并后的定义创建一个实例（不经过单例缓存）
    pub(crate) fn create_bean(
        &self,
        name: &str,
        mbd: &Arc<BeanDefinition>,
        args: Option<Vec<Option<BeanObject>>>,
    ) -> ContainerResult<BeanObject> {
        tracing::trace!("Creating instance of bean '{}'", name);
        let bean = self.do_create_bean(name, mbd, args.as_deref())?;
        tracing::trace!("Finished creating instance of bean '{}'", name);
        Ok(bean)
    }

    /// 创建 Bean 实例并调用生命周期回调
    ///
    /// # 生命周期顺序
    /// 1. 实例化（提供函数 / 工厂方法 / 构造函数）
    /// 2. 单例提前暴露早期引用（三级缓存）
    /// 3. 属性填充
    /// 4. BeanNameAware
    /// 5. BeanPostProcessor.postProcessBeforeInitialization
    /// 6. InitializingBean.afterPropertiesSet，然后 init-method
    /// 7. BeanPostProcessor.postProcessAfterInitialization
    /// 8. 注册销毁回调
    fn do_create_bean(
        &self,
        name: &str,
        mbd: &Arc<BeanDefinition>,
        args: Option<&[Option<BeanObject>]>,
    ) -> ContainerResult<BeanObject> {
        let instance = self.create_bean_instance(name, mbd, args)?;

        let early_singleton_exposure = mbd.is_singleton()
            && self.config.read().allow_circular_references
            && self.registry.is_singleton_currently_in_creation(name);
        if early_singleton_exposure {
            tracing::trace!(
                "Eagerly caching bean '{}' to allow for resolving potential circular references",
                name
            );
            let processors = if mbd.synthetic {
                Vec::new()
            } else {
                self.get_bean_post_processors()
                    .into_iter()
                    .filter(|p| p.as_smart_instantiation_aware().is_some())
                    .collect()
            };
            let raw = instance.clone();
            let bean_name = name.to_string();
            self.registry.add_singleton_factory(
                name,
                Arc::new(move || early_bean_reference(raw.clone(), &bean_name, &processors)),
            );
        }

        let mut exposed = self
            .populate_bean(name, mbd, &instance)
            .and_then(|_| self.initialize_bean_with(name, instance.clone(), mbd))
            .map_err(|e| {
                if failing_bean(&e) == Some(name) {
                    e
                } else {
                    ContainerError::creation_caused_by(name, "Initialization of bean failed", e)
                }
            })?;

        if early_singleton_exposure {
            if let Some(early) = self.registry.get_singleton(name, false)? {
                if Arc::ptr_eq(&exposed, &instance) {
                    exposed = early;
                } else if !self.config.read().allow_raw_injection_despite_wrapping
                    && self.registry.has_dependent_bean(name)
                {
                    let created = self.already_created.read();
                    let actual_dependents: Vec<String> = self
                        .registry
                        .get_dependent_beans(name)
                        .into_iter()
                        .filter(|dependent| created.contains(dependent))
                        .collect();
                    if !actual_dependents.is_empty() {
                        return Err(ContainerError::BeanCurrentlyInCreation {
                            bean: name.to_string(),
                            message: format!(
                                "Bean with name '{}' has been injected into other beans [{}] in its raw version as part of a circular reference, but has eventually been wrapped. This means that said other beans do not use the final version of the bean. Consider returning the same wrapper from get_early_bean_reference, or enable allow_raw_injection_despite_wrapping.",
                                name,
                                actual_dependents.join(",")
                            ),
                        });
                    }
                }
            }
        }

        self.register_disposable_bean_if_necessary(name, &exposed, mbd)
            .map_err(|e| ContainerError::creation_caused_by(name, "Invalid destruction signature", e))?;
        Ok(exposed)
    }

    /// 实例化：提供函数 → 工厂方法 → 构造函数自动装配 / 显式参数 → 默认构造函数
    fn create_bean_instance(
        &self,
        name: &str,
        mbd: &BeanDefinition,
        args: Option<&[Option<BeanObject>]>,
    ) -> ContainerResult<BeanObject> {
        if let Some(supplier) = &mbd.instance_supplier {
            return supplier.get().map_err(|e| {
                ContainerError::creation_caused_by(name, "Instantiation of supplied bean failed", e)
            });
        }

        let resolver = ConstructorResolver::new(self);
        if mbd.factory_method_name.is_some() {
            return resolver.instantiate_using_factory_method(name, mbd, args);
        }

        let class = mbd.bean_class.clone().ok_or_else(|| {
            ContainerError::creation(
                name,
                format!(
                    "Bean class [{}] has no registered metadata",
                    mbd.class_name().unwrap_or("unknown")
                ),
            )
        })?;

        // 重复创建同一个 Bean 时的快捷路径
        if args.is_none() {
            let cached = {
                let cache = mbd.resolution.lock();
                cache
                    .executable
                    .clone()
                    .filter(|e| e.is_constructor())
                    .map(|e| (cache.arguments_resolved, e))
            };
            if let Some((autowire_necessary, constructor)) = cached {
                return if autowire_necessary {
                    resolver.autowire_constructor(name, mbd, &class, None, None)
                } else {
                    self.instantiate_bean(name, mbd, &constructor)
                };
            }
        }

        let candidates = Self::determine_candidate_constructors(&class);
        if candidates.is_some()
            || mbd.autowire_mode == AutowireMode::Constructor
            || mbd.has_constructor_argument_values()
            || args.is_some()
        {
            return resolver.autowire_constructor(name, mbd, &class, candidates, args);
        }

        match class.default_constructor() {
            Some(constructor) => self.instantiate_bean(name, mbd, constructor),
            None => Err(ContainerError::creation(
                name,
                format!("Failed to instantiate [{}]: No default constructor found", class.name()),
            )),
        }
    }

    /// 只有一个带参构造函数且没有默认构造函数时，自动用它装配
    fn determine_candidate_constructors(class: &BeanClass) -> Option<Vec<Executable>> {
        match class.constructors() {
            [only] if only.param_count() > 0 => Some(vec![only.clone()]),
            _ => None,
        }
    }

    fn instantiate_bean(
        &self,
        name: &str,
        mbd: &BeanDefinition,
        constructor: &Executable,
    ) -> ContainerResult<BeanObject> {
        let bean = constructor
            .invoke(None, &Default::default())
            .map_err(|e| ContainerError::creation_caused_by(name, "Instantiation of bean failed", e))?;
        mbd.resolution.lock().executable = Some(constructor.clone());
        Ok(bean)
    }

    /// 属性填充：自动装配的属性 + 定义中的属性值
    fn populate_bean(&self, name: &str, mbd: &BeanDefinition, bean: &BeanObject) -> ContainerResult<()> {
        let mut pvs = mbd.property_values.clone();
        match mbd.autowire_mode {
            AutowireMode::ByName => self.autowire_by_name(name, mbd, bean, &mut pvs)?,
            AutowireMode::ByType => self.autowire_by_type(name, mbd, bean, &mut pvs)?,
            AutowireMode::No | AutowireMode::Constructor => {}
        }
        if pvs.is_empty() {
            return Ok(());
        }
        self.apply_property_values(name, mbd, bean, &pvs)
    }

    /// 未设置的非简单属性
    fn unsatisfied_non_simple_properties(
        &self,
        mbd: &BeanDefinition,
        bean: &BeanObject,
        pvs: &PropertyValues,
    ) -> Vec<ParamSpec> {
        self.class_for_bean(mbd, bean)
            .map(|class| {
                class
                    .properties()
                    .iter()
                    .filter(|p| !pvs.contains(&p.name) && !is_simple_property(&p.param))
                    .map(|p| p.param.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn autowire_by_name(
        &self,
        name: &str,
        mbd: &BeanDefinition,
        bean: &BeanObject,
        pvs: &mut PropertyValues,
    ) -> ContainerResult<()> {
        for param in self.unsatisfied_non_simple_properties(mbd, bean, pvs) {
            let property = param.name.clone().unwrap_or_default();
            if self.contains_bean(&property) {
                let dependency = self.get_bean(&property)?;
                pvs.add(property.clone(), Value::Object(dependency));
                self.register_dependent_bean(&property, name);
                tracing::trace!(
                    "Added autowiring by name from bean name '{}' via property '{}' to bean named '{}'",
                    name,
                    property,
                    property
                );
            } else {
                tracing::trace!(
                    "Not autowiring property '{}' of bean '{}' by name: no matching bean found",
                    property,
                    name
                );
            }
        }
        Ok(())
    }

    fn autowire_by_type(
        &self,
        name: &str,
        mbd: &BeanDefinition,
        bean: &BeanObject,
        pvs: &mut PropertyValues,
    ) -> ContainerResult<()> {
        for param in self.unsatisfied_non_simple_properties(mbd, bean, pvs) {
            let property = param.name.clone().unwrap_or_default();
            let descriptor = DependencyDescriptor::new(param, false);
            let mut autowired_bean_names = Vec::new();
            let resolved = self
                .resolve_dependency(&descriptor, Some(name), Some(&mut autowired_bean_names))
                .map_err(|e| {
                    ContainerError::creation_caused_by(
                        name,
                        format!("Unsatisfied dependency expressed through bean property '{}'", property),
                        e,
                    )
                })?;
            if let Some(dependency) = resolved {
                pvs.add(property.clone(), Value::Object(dependency));
            }
            for autowired in &autowired_bean_names {
                self.register_dependent_bean(autowired, name);
                tracing::trace!(
                    "Autowiring by type from bean name '{}' via property '{}' to bean named '{}'",
                    name,
                    property,
                    autowired
                );
            }
        }
        Ok(())
    }

    fn apply_property_values(
        &self,
        name: &str,
        mbd: &BeanDefinition,
        bean: &BeanObject,
        pvs: &PropertyValues,
    ) -> ContainerResult<()> {
        let class = self.class_for_bean(mbd, bean).ok_or_else(|| {
            ContainerError::creation(
                name,
                "Cannot apply property values: no metadata registered for the bean's type",
            )
        })?;
        let value_resolver = BeanDefinitionValueResolver::new(self, name, mbd);

        for (property, value) in pvs.iter() {
            let descriptor = class.property(property).ok_or_else(|| {
                ContainerError::creation(
                    name,
                    format!(
                        "Invalid property '{}' of bean class [{}]: Bean property '{}' is not writable or has an invalid setter method",
                        property,
                        class.name(),
                        property
                    ),
                )
            })?;
            let resolved = value_resolver
                .resolve_value_if_necessary(&format!("bean property '{}'", property), value)?;
            // 空值不调用 setter
            let resolved = match resolved {
                Some(resolved) => resolved,
                None => continue,
            };
            let converted = self
                .type_converter
                .convert_if_necessary(Some(resolved), &descriptor.param)
                .map_err(|e| {
                    ContainerError::creation_caused_by(
                        name,
                        format!("Failed to convert property value for property '{}'", property),
                        e,
                    )
                })?;
            if let Some(converted) = converted {
                descriptor.set(bean, converted).map_err(|e| {
                    ContainerError::creation_caused_by(
                        name,
                        format!("Error setting property values: property '{}'", property),
                        e,
                    )
                })?;
            }
        }
        Ok(())
    }

    fn initialize_bean_with(
        &self,
        name: &str,
        bean: BeanObject,
        mbd: &BeanDefinition,
    ) -> ContainerResult<BeanObject> {
        if let Some(aware) = self
            .class_for_bean(mbd, &bean)
            .and_then(|class| class.bean_name_aware().cloned())
        {
            aware(&bean, name);
        }

        let mut wrapped = bean;
        if !mbd.synthetic {
            wrapped = self.apply_bean_post_processors_before_initialization(wrapped, name)?;
        }

        self.invoke_init_methods(name, &wrapped, mbd).map_err(|e| {
            ContainerError::creation_caused_by(name, "Invocation of init method failed", e)
        })?;

        if !mbd.synthetic {
            wrapped = self.apply_bean_post_processors_after_initialization(wrapped, name)?;
        }
        Ok(wrapped)
    }

    fn invoke_init_methods(&self, name: &str, bean: &BeanObject, mbd: &BeanDefinition) -> ContainerResult<()> {
        let class = self.class_for_bean(mbd, bean);
        if let Some(initializing) = class.as_ref().and_then(|c| c.initializing_callback()) {
            tracing::trace!("Invoking afterPropertiesSet() on bean with name '{}'", name);
            initializing(bean)?;
        }

        match &mbd.init_method {
            None => Ok(()),
            Some(LifecycleCallback::Callback(callback)) => {
                tracing::trace!("Invoking init callback on bean with name '{}'", name);
                callback(bean)
            }
            Some(LifecycleCallback::Named(method_name)) => {
                let method = class
                    .as_ref()
                    .and_then(|c| c.method(method_name).cloned())
                    .ok_or_else(|| ContainerError::BeanDefinitionStore {
                        bean: name.to_string(),
                        message: format!(
                            "Could not find an init method named '{}' on bean with name '{}'",
                            method_name, name
                        ),
                    })?;
                tracing::trace!("Invoking init method '{}' on bean with name '{}'", method_name, name);
                method(bean)
            }
        }
    }

    fn disposable_adapter(
        &self,
        name: &str,
        bean: &BeanObject,
        mbd: &BeanDefinition,
    ) -> ContainerResult<Option<DisposableBeanAdapter>> {
        let class = self.class_for_bean(mbd, bean);
        DisposableBeanAdapter::for_bean(
            bean.clone(),
            name,
            mbd,
            class.as_deref(),
            &self.get_bean_post_processors(),
        )
    }

    /// 单例的销毁回调在容器关闭时执行，原型不注册
    fn register_disposable_bean_if_necessary(
        &self,
        name: &str,
        bean: &BeanObject,
        mbd: &BeanDefinition,
    ) -> ContainerResult<()> {
        if !mbd.is_singleton() {
            return Ok(());
        }
        if let Some(adapter) = self.disposable_adapter(name, bean, mbd)? {
            self.registry
                .register_disposable_bean(name, Arc::new(adapter) as Arc<dyn DisposableBean>);
        }
        Ok(())
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> ContainerResult<BeanObject> {
        self.do_get_bean(name, None)
    }

    fn get_bean_with_args(
        &self,
        name: &str,
        args: Vec<Option<BeanObject>>,
    ) -> ContainerResult<BeanObject> {
        self.do_get_bean(name, Some(&args))
    }

    fn contains_bean(&self, name: &str) -> bool {
        let bean_name = self.transformed_bean_name(name);
        self.contains_singleton(&bean_name) || self.contains_bean_definition(&bean_name)
    }

    fn is_singleton(&self, name: &str) -> ContainerResult<bool> {
        let bean_name = self.transformed_bean_name(name);
        if self.contains_singleton(&bean_name) {
            return Ok(true);
        }
        Ok(self.get_merged_bean_definition(&bean_name)?.is_singleton())
    }

    fn is_prototype(&self, name: &str) -> ContainerResult<bool> {
        let bean_name = self.transformed_bean_name(name);
        if !self.contains_bean_definition(&bean_name) && self.contains_singleton(&bean_name) {
            return Ok(false);
        }
        Ok(self.get_merged_bean_definition(&bean_name)?.is_prototype())
    }

    fn get_type(&self, name: &str) -> ContainerResult<Option<TypeId>> {
        let bean_name = self.transformed_bean_name(name);
        if let Some(singleton) = self.registry.get_singleton(&bean_name, false)? {
            return Ok(Some(instance_type_id(&singleton)));
        }
        let mbd = self.get_merged_bean_definition(&bean_name)?;
        Ok(self.predict_bean_type(&bean_name, &mbd))
    }
}

impl BeanFactoryExt for DefaultListableBeanFactory {
    fn get_bean_of<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        let bean = self.get_bean(name)?;
        let found = self
            .class_for_instance(&bean)
            .map_or_else(|| "unknown".to_string(), |class| class.type_name().to_string());
        bean.downcast::<T>().map_err(|_| ContainerError::TypeMismatch {
            bean: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
            found,
        })
    }

    fn get_bean_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        let descriptor = DependencyDescriptor::of::<T>(true);
        let bean = self
            .resolve_dependency(&descriptor, None, None)?
            .ok_or_else(|| ContainerError::NoQualifyingBean {
                type_name: std::any::type_name::<T>().to_string(),
                message: "expected at least 1 bean which qualifies as autowire candidate".to_string(),
            })?;
        bean.downcast::<T>().map_err(|_| ContainerError::TypeMismatch {
            bean: std::any::type_name::<T>().to_string(),
            expected: std::any::type_name::<T>().to_string(),
            found: "instance of another type".to_string(),
        })
    }

    fn get_beans_of_type<T: Any + Send + Sync>(&self) -> ContainerResult<Vec<(String, Arc<T>)>> {
        let mut beans = Vec::new();
        for name in self.get_bean_names_for_type(TypeId::of::<T>()) {
            beans.push((name.clone(), self.get_bean_of::<T>(&name)?));
        }
        Ok(beans)
    }

    fn contains_bean_by_type<T: Any + Send + Sync>(&self) -> bool {
        !self.get_bean_names_for_type(TypeId::of::<T>()).is_empty()
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn contains_bean_definition(&self, name: &str) -> bool {
        self.bean_definitions.read().contains_key(name)
    }

    fn get_bean_definition_count(&self) -> usize {
        self.bean_definitions.read().len()
    }

    fn get_bean_definition_names(&self) -> Vec<String> {
        self.bean_definition_names.read().clone()
    }

    fn get_bean_names_for_type(&self, type_id: TypeId) -> Vec<String> {
        let mut result = Vec::new();
        for name in self.get_bean_definition_names() {
            let mbd = match self.get_merged_bean_definition(&name) {
                Ok(mbd) => mbd,
                Err(e) => {
                    tracing::trace!("Ignoring bean definition '{}' during type lookup: {}", name, e);
                    continue;
                }
            };
            if mbd.is_abstract {
                continue;
            }
            if self.predict_bean_type(&name, &mbd) == Some(type_id) {
                result.push(name);
            }
        }

        let manual = self.manual_singleton_names.read().clone();
        for name in manual {
            if let Ok(Some(singleton)) = self.registry.get_singleton(&name, false) {
                if instance_type_id(&singleton) == type_id && !result.contains(&name) {
                    result.push(name);
                }
            }
        }
        result
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut processors = self.bean_post_processors.write();
        processors.retain(|p| !Arc::ptr_eq(p, &processor));
        tracing::debug!("Registered BeanPostProcessor: {}", processor.name());
        processors.push(processor);
    }

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.bean_post_processors.read().clone()
    }

    fn get_bean_post_processor_count(&self) -> usize {
        self.bean_post_processors.read().len()
    }

    fn add_embedded_value_resolver(&self, resolver: Arc<dyn StringValueResolver>) {
        self.embedded_value_resolvers.write().push(resolver);
    }

    fn has_embedded_value_resolver(&self) -> bool {
        !self.embedded_value_resolvers.read().is_empty()
    }

    fn resolve_embedded_value(&self, value: &str) -> ContainerResult<Option<String>> {
        let resolvers = self.embedded_value_resolvers.read().clone();
        let mut result = value.to_string();
        for resolver in resolvers {
            match resolver.resolve_string_value(&result)? {
                Some(resolved) => result = resolved,
                None => return Ok(None),
            }
        }
        Ok(Some(result))
    }

    fn register_singleton(&self, name: &str, singleton: BeanObject) -> ContainerResult<()> {
        self.registry.register_singleton(name, singleton)?;
        if !self.contains_bean_definition(name) {
            let mut manual = self.manual_singleton_names.write();
            if !manual.iter().any(|n| n == name) {
                manual.push(name.to_string());
            }
        }
        Ok(())
    }

    fn register_dependent_bean(&self, bean: &str, dependent: &str) {
        self.registry.register_dependent_bean(bean, dependent);
    }

    fn get_dependent_beans(&self, name: &str) -> Vec<String> {
        self.registry.get_dependent_beans(name)
    }

    fn get_dependencies_for_bean(&self, name: &str) -> Vec<String> {
        self.registry.get_dependencies_for_bean(name)
    }

    fn get_merged_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>> {
        let bean_name = self.transformed_bean_name(name);
        if let Some(merged) = self.merged_definitions.read().get(&bean_name) {
            return Ok(merged.clone());
        }
        let definition = self
            .bean_definitions
            .read()
            .get(&bean_name)
            .cloned()
            .ok_or_else(|| ContainerError::NoSuchBeanDefinition(bean_name.clone()))?;

        let merged = {
            let _merging = self.definitions_in_merge.guard(&bean_name);
            self.merge_bean_definition_named(Some(&bean_name), &definition)?
        };
        Ok(self
            .merged_definitions
            .write()
            .entry(bean_name)
            .or_insert_with(|| Arc::new(merged))
            .clone())
    }

    fn is_currently_in_creation(&self, name: &str) -> bool {
        let bean_name = self.transformed_bean_name(name);
        self.registry.is_currently_in_creation(&bean_name)
            || self.prototypes_in_creation.is_creating(&bean_name)
    }

    fn destroy_singleton(&self, name: &str) {
        self.registry.destroy_singleton(name);
        self.manual_singleton_names.write().retain(|n| n != name);
    }

    fn destroy_bean(&self, name: &str, bean: BeanObject) -> ContainerResult<()> {
        let mbd = self.get_merged_bean_definition(name)?;
        match self.disposable_adapter(name, &bean, &mbd)? {
            Some(adapter) => adapter.destroy(),
            None => Ok(()),
        }
    }
}

impl ConfigurableListableBeanFactory for DefaultListableBeanFactory {
    fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        tracing::trace!("Pre-instantiating singletons in {:p}", self);
        let names = self.get_bean_definition_names();

        for name in &names {
            let mbd = self.get_merged_bean_definition(name)?;
            if !mbd.is_abstract && mbd.is_singleton() && !mbd.lazy {
                self.get_bean(name)?;
            }
        }

        // 所有非延迟单例就绪后的回调
        for name in &names {
            let singleton = match self.registry.get_singleton(name, false)? {
                Some(singleton) => singleton,
                None => continue,
            };
            let mbd = self.get_merged_bean_definition(name)?;
            let callback = mbd.capabilities.after_singletons_instantiated.clone().or_else(|| {
                self.class_for_bean(&mbd, &singleton)
                    .and_then(|class| class.capabilities().after_singletons_instantiated.clone())
            });
            if let Some(callback) = callback {
                tracing::trace!("Invoking after_singletons_instantiated on bean '{}'", name);
                callback(&singleton)?;
            }
        }
        Ok(())
    }

    fn freeze_configuration(&self) {
        self.configuration_frozen.store(true, Ordering::SeqCst);
        tracing::debug!(
            "Bean factory configuration frozen with {} bean definitions",
            self.get_bean_definition_count()
        );
    }

    fn is_configuration_frozen(&self) -> bool {
        self.configuration_frozen.load(Ordering::SeqCst)
    }

    fn destroy_singletons(&self) {
        self.registry.destroy_singletons();
        self.manual_singleton_names.write().clear();
    }
}

impl BeanDefinitionRegistry for DefaultListableBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()> {
        if name.trim().is_empty() {
            return Err(ContainerError::IllegalState("Bean name must not be empty".to_string()));
        }
        definition.validate().map_err(|e| ContainerError::BeanDefinitionStore {
            bean: name.to_string(),
            message: format!("Validation of bean definition failed: {}", e),
        })?;

        if self.is_configuration_frozen() {
            return Err(ContainerError::ConfigurationFrozen(format!(
                "register bean definition '{}'",
                name
            )));
        }

        let allow_overriding = self.config.read().allow_bean_definition_overriding;
        if let Some(class) = &definition.bean_class {
            self.register_class(class.clone());
        }

        let existing = {
            let mut definitions = self.bean_definitions.write();
            let existing = definitions.get(name).map(|d| format!("{:?}", d));
            if let Some(existing) = &existing {
                if !allow_overriding {
                    return Err(ContainerError::BeanDefinitionOverride {
                        bean: name.to_string(),
                        existing: existing.clone(),
                    });
                }
                tracing::debug!(
                    "Overriding bean definition for bean '{}' with a different definition",
                    name
                );
            }
            definitions.insert(name.to_string(), definition);
            existing
        };

        if existing.is_none() {
            if self.registry.is_alias(name) {
                if !allow_overriding {
                    self.bean_definitions.write().remove(name);
                    return Err(ContainerError::BeanDefinitionOverride {
                        bean: name.to_string(),
                        existing: format!(
                            "alias for bean '{}'",
                            self.transformed_bean_name(name)
                        ),
                    });
                }
                tracing::info!(
                    "Removing alias '{}' for bean '{}' due to registration of bean definition for bean '{}'",
                    name,
                    self.transformed_bean_name(name),
                    name
                );
                self.registry.remove_alias(name)?;
            }
            self.bean_definition_names.write().push(name.to_string());
            self.manual_singleton_names.write().retain(|n| n != name);
        }

        if existing.is_some() || self.contains_singleton(name) {
            self.reset_bean_definition(name);
        }
        tracing::trace!("Registered bean definition '{}'", name);
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()> {
        if self.is_configuration_frozen() {
            return Err(ContainerError::ConfigurationFrozen(format!(
                "remove bean definition '{}'",
                name
            )));
        }
        if self.bean_definitions.write().remove(name).is_none() {
            tracing::trace!("No bean named '{}' found", name);
            return Err(ContainerError::NoSuchBeanDefinition(name.to_string()));
        }
        self.bean_definition_names.write().retain(|n| n != name);
        self.reset_bean_definition(name);
        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition> {
        self.bean_definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::NoSuchBeanDefinition(name.to_string()))
    }

    fn is_bean_name_in_use(&self, name: &str) -> bool {
        self.registry.is_alias(name)
            || self.contains_singleton(name)
            || self.contains_bean_definition(name)
            || self.registry.has_dependent_bean(name)
    }
}

impl AutowireCapableBeanFactory for DefaultListableBeanFactory {
    fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting_bean_name: Option<&str>,
        autowired_bean_names: Option<&mut Vec<String>>,
    ) -> ContainerResult<Option<BeanObject>> {
        let param = &descriptor.param;
        let candidates = self.find_autowire_candidates(requesting_bean_name, param);

        let chosen = match candidates.len() {
            0 => {
                if descriptor.required {
                    return Err(ContainerError::NoQualifyingBean {
                        type_name: param.type_name.to_string(),
                        message: "expected at least 1 bean which qualifies as autowire candidate"
                            .to_string(),
                    });
                }
                return Ok(None);
            }
            1 => candidates[0].clone(),
            _ => match self.determine_autowire_candidate(&candidates, descriptor)? {
                Some(chosen) => chosen,
                None => {
                    if descriptor.required {
                        return Err(ContainerError::NoUniqueBeanDefinition {
                            type_name: param.type_name.to_string(),
                            candidates,
                        });
                    }
                    return Ok(None);
                }
            },
        };

        if let Some(names) = autowired_bean_names {
            names.push(chosen.clone());
        }
        self.get_bean(&chosen).map(Some)
    }

    fn apply_bean_post_processors_before_initialization(
        &self,
        bean: BeanObject,
        name: &str,
    ) -> ContainerResult<BeanObject> {
        let mut result = bean;
        for processor in self.get_bean_post_processors() {
            result = processor.post_process_before_initialization(result, name)?;
        }
        Ok(result)
    }

    fn apply_bean_post_processors_after_initialization(
        &self,
        bean: BeanObject,
        name: &str,
    ) -> ContainerResult<BeanObject> {
        let mut result = bean;
        for processor in self.get_bean_post_processors() {
            result = processor.post_process_after_initialization(result, name)?;
        }
        Ok(result)
    }
}

/// 别名注册：别名不能覆盖同名定义（除非允许覆盖）
///
/// `get_aliases` 按 BeanFactory 的语义：传入别名时结果包含规范名称，不包含传入的名称本身
impl AliasRegistry for DefaultListableBeanFactory {
    fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()> {
        let allow_overriding = self.config.read().allow_bean_definition_overriding;
        if alias != name && !allow_overriding {
            if self.contains_bean_definition(alias) {
                return Err(ContainerError::IllegalState(format!(
                    "Cannot register alias '{}' for name '{}': Alias would override bean definition '{}'",
                    alias, name, alias
                )));
            }
            if self.registry.is_alias(alias) {
                let registered = self.transformed_bean_name(alias);
                if registered != self.transformed_bean_name(name) {
                    return Err(ContainerError::AliasConflict {
                        alias: alias.to_string(),
                        name: name.to_string(),
                        registered,
                    });
                }
            }
        }
        self.registry.register_alias(name, alias)
    }

    fn remove_alias(&self, alias: &str) -> ContainerResult<()> {
        self.registry.remove_alias(alias)
    }

    fn is_alias(&self, name: &str) -> bool {
        self.registry.is_alias(name)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        let bean_name = self.transformed_bean_name(name);
        let mut aliases = Vec::new();
        if bean_name != name {
            aliases.push(bean_name.clone());
        }
        for alias in self.registry.get_aliases(&bean_name) {
            if alias != name {
                aliases.push(alias);
            }
        }
        aliases
    }
}
