use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use arbor_beans::{
    BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, BeanFactoryPostProcessor,
    BeanObject, BeanPostProcessor, ClassRegistry, ConfigurableBeanFactory,
    ConfigurableListableBeanFactory, DefaultListableBeanFactory, FactoryConfig,
    ListableBeanFactory, Scope, TomlBeanDefinitionReader,
};
use arbor_core::utils::dependency::{topological_sort, validate_dependency_graph};
use arbor_core::{AliasRegistry, ContainerError, ContainerResult, Environment, PropertySource};

use crate::post_processor;

/// Environment 注册为单例时使用的名称
pub const ENVIRONMENT_BEAN_NAME: &str = "environment";

/// Shutdown hook类型
pub type ShutdownHook = Box<dyn Fn() -> ContainerResult<()> + Send + Sync>;

/// 应用上下文
///
/// 持有 BeanFactory 和 Environment，负责一次性的刷新流程：
/// 组件扫描、BeanFactoryPostProcessor、BeanPostProcessor 注册、冻结配置、预实例化单例。
/// 关闭时执行 shutdown hooks 并按依赖顺序销毁单例。
pub struct ApplicationContext {
    /// Bean 工厂 - 负责 Bean 的创建和管理
    bean_factory: Arc<DefaultListableBeanFactory>,

    /// 配置环境
    environment: Arc<Environment>,

    /// Shutdown hooks
    shutdown_hooks: RwLock<Vec<ShutdownHook>>,

    app_name: RwLock<Option<String>>,

    /// 直接添加的 BeanFactoryPostProcessor（按优先级排序）
    bean_factory_post_processors: RwLock<Vec<Arc<dyn BeanFactoryPostProcessor>>>,

    /// 刷新时是否扫描 `component!` 提交的组件
    component_scan: AtomicBool,

    refreshed: AtomicBool,
    active: AtomicBool,
    closed: AtomicBool,

    /// 刷新与关闭互斥
    startup_shutdown_lock: Mutex<()>,
}

impl ApplicationContext {
    /// 创建新的应用上下文
    pub fn new() -> Self {
        Self::with_environment(Arc::new(Environment::new()))
    }

    /// 使用已有的 Environment 创建上下文
    pub fn with_environment(environment: Arc<Environment>) -> Self {
        Self {
            bean_factory: Arc::new(DefaultListableBeanFactory::new()),
            environment,
            shutdown_hooks: RwLock::new(Vec::new()),
            app_name: RwLock::new(None),
            bean_factory_post_processors: RwLock::new(Vec::new()),
            component_scan: AtomicBool::new(false),
            refreshed: AtomicBool::new(false),
            active: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            startup_shutdown_lock: Mutex::new(()),
        }
    }

    /// 构建器模式创建上下文
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    /// 获取内部的 BeanFactory
    pub fn bean_factory(&self) -> &Arc<DefaultListableBeanFactory> {
        &self.bean_factory
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn set_app_name(&self, name: impl Into<String>) {
        *self.app_name.write() = Some(name.into());
    }

    pub fn app_name(&self) -> Option<String> {
        self.app_name.read().clone()
    }

    fn display_name(&self) -> String {
        match self.app_name() {
            Some(name) => format!("ApplicationContext '{}'", name),
            None => "ApplicationContext".to_string(),
        }
    }

    /// 刷新时是否扫描组件注册表
    pub fn set_component_scan(&self, enabled: bool) {
        self.component_scan.store(enabled, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 注册 Bean 定义
    pub fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()> {
        self.bean_factory.register_bean_definition(name, definition)
    }

    pub fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()> {
        self.bean_factory.register_alias(name, alias)
    }

    /// 注册由闭包创建的单例 Bean
    pub fn register_bean<T, F>(&self, name: &str, factory: F) -> ContainerResult<()>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register_bean_definition(name, BeanDefinition::from_supplier(factory))
    }

    /// 注册原型 Bean
    pub fn register_prototype<T, F>(&self, name: &str, factory: F) -> ContainerResult<()>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register_bean_definition(
            name,
            BeanDefinition::from_supplier(factory).with_scope(Scope::Prototype),
        )
    }

    /// 注册已经创建好的单例实例
    pub fn register_singleton(&self, name: &str, instance: BeanObject) -> ContainerResult<()> {
        self.bean_factory.register_singleton(name, instance)
    }

    /// 从 TOML 文件读取 Bean 定义，返回注册的数量
    pub fn load_bean_definitions(
        &self,
        path: impl AsRef<Path>,
        classes: &ClassRegistry,
    ) -> ContainerResult<usize> {
        TomlBeanDefinitionReader::new(&self.bean_factory, classes).load_from_file(path)
    }

    /// 从 TOML 文本读取 Bean 定义
    pub fn load_bean_definitions_from_str(
        &self,
        content: &str,
        classes: &ClassRegistry,
    ) -> ContainerResult<usize> {
        TomlBeanDefinitionReader::new(&self.bean_factory, classes).load_from_str(content)
    }

    /// 注册 shutdown hook
    ///
    /// Shutdown hook 会在应用关闭时按注册顺序执行
    pub fn register_shutdown_hook<F>(&self, hook: F)
    where
        F: Fn() -> ContainerResult<()> + Send + Sync + 'static,
    {
        let mut hooks = self.shutdown_hooks.write();
        hooks.push(Box::new(hook));
        tracing::debug!("Registered shutdown hook, total: {}", hooks.len());
    }

    /// 注册 BeanPostProcessor，直接委托给 BeanFactory
    pub fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.bean_factory.add_bean_post_processor(processor);
    }

    /// 注册 BeanFactoryPostProcessor，刷新时先于定义中声明的处理器执行
    pub fn add_bean_factory_post_processor(&self, processor: Arc<dyn BeanFactoryPostProcessor>) {
        let mut processors = self.bean_factory_post_processors.write();
        let order = processor.order();
        processors.push(processor);
        // order 越小优先级越高
        processors.sort_by_key(|p| p.order());
        tracing::debug!("Registered BeanFactoryPostProcessor with order {}", order);
    }

    pub fn get_bean_factory_post_processors(&self) -> Vec<Arc<dyn BeanFactoryPostProcessor>> {
        self.bean_factory_post_processors.read().clone()
    }

    /// 刷新上下文
    ///
    /// 只能调用一次。失败时销毁已经创建的单例并返回原始错误。
    pub fn refresh(&self) -> ContainerResult<()> {
        let _guard = self.startup_shutdown_lock.lock();

        if self.is_closed() {
            return Err(ContainerError::IllegalState(format!(
                "{} has been closed already",
                self.display_name()
            )));
        }
        if self.refreshed.swap(true, Ordering::SeqCst) {
            return Err(ContainerError::IllegalState(
                "ApplicationContext does not support multiple refresh attempts: just call 'refresh' once"
                    .to_string(),
            ));
        }

        let start = Instant::now();
        tracing::info!("Refreshing {}", self.display_name());

        match self.do_refresh() {
            Ok(()) => {
                self.active.store(true, Ordering::SeqCst);
                tracing::info!(
                    "{} refreshed in {}ms with {} bean definition(s)",
                    self.display_name(),
                    start.elapsed().as_millis(),
                    self.bean_factory.get_bean_definition_count()
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    "Exception encountered during context initialization - cancelling refresh attempt: {}",
                    e
                );
                self.bean_factory.destroy_singletons();
                Err(e)
            }
        }
    }

    fn do_refresh(&self) -> ContainerResult<()> {
        if self.component_scan.load(Ordering::SeqCst) {
            self.scan_components()?;
        }

        self.prepare_bean_factory()?;

        let processors = self.get_bean_factory_post_processors();
        post_processor::invoke_bean_factory_post_processors(&self.bean_factory, &processors)?;
        post_processor::register_bean_post_processors(&self.bean_factory)?;

        self.bean_factory.freeze_configuration();
        self.bean_factory.preinstantiate_singletons()
    }

    /// 把 Environment 作为单例暴露，供构造参数按类型注入
    fn prepare_bean_factory(&self) -> ContainerResult<()> {
        if !self.bean_factory.contains_bean(ENVIRONMENT_BEAN_NAME) {
            self.bean_factory
                .register_singleton(ENVIRONMENT_BEAN_NAME, self.environment.clone())?;
        }
        Ok(())
    }

    /// 验证 depends-on 声明
    ///
    /// 检查：
    /// - 缺失的依赖（声明的依赖没有注册）
    /// - 循环依赖（A -> B -> C -> A）
    pub fn validate_dependencies(&self) -> ContainerResult<()> {
        let mut dependency_map: HashMap<String, Vec<String>> = HashMap::new();
        for name in self.bean_factory.get_singleton_names() {
            dependency_map.entry(name).or_default();
        }
        for name in self.bean_factory.get_bean_definition_names() {
            let mbd = self.bean_factory.get_merged_bean_definition(&name)?;
            let deps = mbd
                .depends_on
                .iter()
                .map(|dep| self.bean_factory.transformed_bean_name(dep))
                .collect();
            dependency_map.insert(name, deps);
        }

        validate_dependency_graph(&dependency_map).map_err(|e| {
            let bean = match &e {
                arbor_core::utils::dependency::DependencyValidationError::CircularDependency {
                    cycle,
                } => cycle.first().cloned().unwrap_or_default(),
                arbor_core::utils::dependency::DependencyValidationError::MissingDependency {
                    bean,
                    ..
                } => bean.clone(),
            };
            ContainerError::BeanDefinitionStore {
                bean,
                message: e.to_string(),
            }
        })?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(order) = topological_sort(&dependency_map) {
                tracing::debug!("Depends-on order: {}", order.join(", "));
            }
        }

        tracing::info!(
            "Dependency validation passed for {} bean(s)",
            dependency_map.len()
        );
        Ok(())
    }

    /// 关闭上下文：执行 shutdown hooks，然后销毁所有单例
    ///
    /// 重复调用不做任何事
    pub fn close(&self) {
        let _guard = self.startup_shutdown_lock.lock();
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::info!("Closing {}", self.display_name());

        let hooks = self.shutdown_hooks.read();
        tracing::debug!("Executing {} shutdown hook(s)", hooks.len());
        for (idx, hook) in hooks.iter().enumerate() {
            match hook() {
                Ok(_) => tracing::debug!("Shutdown hook {} executed successfully", idx + 1),
                Err(e) => tracing::warn!("Shutdown hook {} failed: {}", idx + 1, e),
            }
        }
        drop(hooks);

        self.bean_factory.destroy_singletons();
        self.active.store(false, Ordering::SeqCst);

        tracing::info!("{} closed", self.display_name());
    }

    fn assert_active(&self) -> ContainerResult<()> {
        if self.is_active() {
            return Ok(());
        }
        if self.is_closed() {
            Err(ContainerError::IllegalState(format!(
                "{} has been closed already",
                self.display_name()
            )))
        } else {
            Err(ContainerError::IllegalState(format!(
                "{} has not been refreshed yet",
                self.display_name()
            )))
        }
    }
}

impl Default for ApplicationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanFactory for ApplicationContext {
    fn get_bean(&self, name: &str) -> ContainerResult<BeanObject> {
        self.assert_active()?;
        self.bean_factory.get_bean(name)
    }

    fn get_bean_with_args(
        &self,
        name: &str,
        args: Vec<Option<BeanObject>>,
    ) -> ContainerResult<BeanObject> {
        self.assert_active()?;
        self.bean_factory.get_bean_with_args(name, args)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.bean_factory.contains_bean(name)
    }

    fn is_singleton(&self, name: &str) -> ContainerResult<bool> {
        self.bean_factory.is_singleton(name)
    }

    fn is_prototype(&self, name: &str) -> ContainerResult<bool> {
        self.bean_factory.is_prototype(name)
    }

    fn get_type(&self, name: &str) -> ContainerResult<Option<TypeId>> {
        self.assert_active()?;
        self.bean_factory.get_type(name)
    }
}

impl BeanFactoryExt for ApplicationContext {
    fn get_bean_of<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        self.assert_active()?;
        self.bean_factory.get_bean_of::<T>(name)
    }

    fn get_bean_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        self.assert_active()?;
        self.bean_factory.get_bean_by_type::<T>()
    }

    fn get_beans_of_type<T: Any + Send + Sync>(&self) -> ContainerResult<Vec<(String, Arc<T>)>> {
        self.assert_active()?;
        self.bean_factory.get_beans_of_type::<T>()
    }

    fn contains_bean_by_type<T: Any + Send + Sync>(&self) -> bool {
        self.bean_factory.contains_bean_by_type::<T>()
    }
}

impl ListableBeanFactory for ApplicationContext {
    fn contains_bean_definition(&self, name: &str) -> bool {
        self.bean_factory.contains_bean_definition(name)
    }

    fn get_bean_definition_count(&self) -> usize {
        self.bean_factory.get_bean_definition_count()
    }

    fn get_bean_definition_names(&self) -> Vec<String> {
        self.bean_factory.get_bean_definition_names()
    }

    fn get_bean_names_for_type(&self, type_id: TypeId) -> Vec<String> {
        self.bean_factory.get_bean_names_for_type(type_id)
    }
}

/// 应用上下文构建器
pub struct ApplicationContextBuilder {
    context: ApplicationContext,
    factory_config: Option<FactoryConfig>,
}

impl ApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            context: ApplicationContext::new(),
            factory_config: None,
        }
    }

    pub fn app_name(self, name: impl Into<String>) -> Self {
        self.context.set_app_name(name);
        self
    }

    /// 添加配置源到 Environment
    pub fn add_property_source(mut self, source: Box<dyn PropertySource>) -> Self {
        self.add_property_source_mut(source);
        self
    }

    /// 添加配置源（可变引用版本，不消费 self）
    pub(crate) fn add_property_source_mut(&mut self, source: Box<dyn PropertySource>) {
        self.context.environment.add_property_source(source);
    }

    /// 设置激活的 profiles
    pub fn set_active_profiles(self, profiles: Vec<String>) -> Self {
        self.context.environment.set_active_profiles(profiles);
        self
    }

    /// 工厂行为配置，不设置时从 Environment 的 `arbor.factory.*` 读取
    pub fn factory_config(mut self, config: FactoryConfig) -> Self {
        self.factory_config = Some(config);
        self
    }

    /// 刷新时扫描 `component!` 提交的组件
    pub fn component_scan(self, enabled: bool) -> Self {
        self.context.set_component_scan(enabled);
        self
    }

    /// 注册 Bean 定义
    pub fn register(self, name: &str, definition: BeanDefinition) -> ContainerResult<Self> {
        self.context.register_bean_definition(name, definition)?;
        Ok(self)
    }

    /// 注册单例 Bean
    pub fn register_bean<T, F>(self, name: &str, factory: F) -> ContainerResult<Self>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.context.register_bean(name, factory)?;
        Ok(self)
    }

    /// 注册原型 Bean
    pub fn register_prototype<T, F>(self, name: &str, factory: F) -> ContainerResult<Self>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.context.register_prototype(name, factory)?;
        Ok(self)
    }

    pub fn add_bean_factory_post_processor(self, processor: Arc<dyn BeanFactoryPostProcessor>) -> Self {
        self.context.add_bean_factory_post_processor(processor);
        self
    }

    pub fn add_bean_post_processor(self, processor: Arc<dyn BeanPostProcessor>) -> Self {
        self.context.add_bean_post_processor(processor);
        self
    }

    /// 构建上下文（尚未刷新）
    pub fn build(self) -> ContainerResult<Arc<ApplicationContext>> {
        let config = match self.factory_config {
            Some(config) => config,
            None => FactoryConfig::from_environment(&self.context.environment),
        };
        tracing::debug!("Building ApplicationContext with {:?}", config);
        self.context.bean_factory.set_config(config);
        Ok(Arc::new(self.context))
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
