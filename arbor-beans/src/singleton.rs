//! 单例注册表
//!
//! 三级缓存：
//! - `singleton_objects`：完全初始化好的单例
//! - `early_singleton_objects`：提前暴露的早期引用（属性尚未填充完）
//! - `singleton_factories`：生成早期引用的工厂，第一次被循环引用时调用
//!
//! 同一个名称任何时刻最多出现在一级缓存中（升级过程持有单例锁）。
//! 单例锁是可重入的：创建单例的线程在工厂回调里还会继续获取其他单例。
//! 数据锁只在读写 map 的瞬间持有，从不跨越用户回调。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};

use arbor_core::{AliasRegistry, ContainerError, ContainerResult, SimpleAliasRegistry};

use crate::lifecycle::DisposableBean;
use crate::BeanObject;

/// 生成早期引用的工厂
pub type SingletonFactory = Arc<dyn Fn() -> ContainerResult<BeanObject> + Send + Sync>;

/// 被吞掉的错误最多保留这么多条
const SUPPRESSED_ERRORS_LIMIT: usize = 100;

#[derive(Default)]
pub struct DefaultSingletonBeanRegistry {
    aliases: SimpleAliasRegistry,

    /// 相当于 synchronized(singletonObjects)
    singleton_lock: ReentrantMutex<()>,

    singleton_objects: RwLock<HashMap<String, BeanObject>>,
    early_singleton_objects: Mutex<HashMap<String, BeanObject>>,
    singleton_factories: Mutex<HashMap<String, SingletonFactory>>,

    /// 按注册顺序记录的单例名
    registered_singletons: Mutex<Vec<String>>,

    singletons_in_creation: Mutex<HashSet<String>>,
    in_creation_check_exclusions: Mutex<HashSet<String>>,

    /// 创建单例期间被吞掉的错误，None 表示当前不收集
    suppressed_errors: Mutex<Option<Vec<String>>>,

    in_destruction: AtomicBool,

    /// 按注册顺序记录的可销毁 Bean
    disposable_beans: Mutex<Vec<(String, Arc<dyn DisposableBean>)>>,

    /// 外部 Bean -> 包含的内部 Bean
    contained_bean_map: Mutex<HashMap<String, Vec<String>>>,
    /// Bean -> 依赖它的 Bean
    dependent_bean_map: Mutex<HashMap<String, Vec<String>>>,
    /// Bean -> 它依赖的 Bean
    dependencies_for_bean_map: Mutex<HashMap<String, Vec<String>>>,
}

fn push_unique(list: &mut Vec<String>, name: &str) -> bool {
    if list.iter().any(|n| n == name) {
        false
    } else {
        list.push(name.to_string());
        true
    }
}

impl DefaultSingletonBeanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aliases(&self) -> &SimpleAliasRegistry {
        &self.aliases
    }

    pub fn canonical_name(&self, name: &str) -> String {
        self.aliases.canonical_name(name)
    }

    /// 单例锁，持有期间其他线程无法创建或升级单例
    pub fn singleton_mutex(&self) -> ReentrantMutexGuard<'_, ()> {
        self.singleton_lock.lock()
    }

    /// 注册一个外部创建好的单例
    pub fn register_singleton(&self, name: &str, singleton: BeanObject) -> ContainerResult<()> {
        let _guard = self.singleton_lock.lock();
        if self.singleton_objects.read().contains_key(name) {
            return Err(ContainerError::IllegalState(format!(
                "Could not register object under bean name '{}': there is already an object bound",
                name
            )));
        }
        self.add_singleton(name, singleton);
        Ok(())
    }

    /// 放入一级缓存，清理二、三级缓存
    pub fn add_singleton(&self, name: &str, singleton: BeanObject) {
        let _guard = self.singleton_lock.lock();
        self.singleton_objects
            .write()
            .insert(name.to_string(), singleton);
        self.singleton_factories.lock().remove(name);
        self.early_singleton_objects.lock().remove(name);
        push_unique(&mut self.registered_singletons.lock(), name);
    }

    /// 放入三级缓存（一级缓存中已有时忽略）
    pub fn add_singleton_factory(&self, name: &str, factory: SingletonFactory) {
        let _guard = self.singleton_lock.lock();
        if self.singleton_objects.read().contains_key(name) {
            return;
        }
        self.singleton_factories
            .lock()
            .insert(name.to_string(), factory);
        self.early_singleton_objects.lock().remove(name);
        push_unique(&mut self.registered_singletons.lock(), name);
    }

    /// 按名称取单例
    ///
    /// 一级缓存未命中且该单例正在创建时，依次查二级缓存和三级缓存。
    /// `allow_early_reference` 为 true 时调用三级缓存中的工厂并把结果升级到二级缓存。
    pub fn get_singleton(
        &self,
        name: &str,
        allow_early_reference: bool,
    ) -> ContainerResult<Option<BeanObject>> {
        if let Some(singleton) = self.singleton_objects.read().get(name).cloned() {
            return Ok(Some(singleton));
        }
        if !self.is_singleton_currently_in_creation(name) {
            return Ok(None);
        }

        let _guard = self.singleton_lock.lock();
        if let Some(singleton) = self.singleton_objects.read().get(name).cloned() {
            return Ok(Some(singleton));
        }
        if let Some(early) = self.early_singleton_objects.lock().get(name).cloned() {
            return Ok(Some(early));
        }
        if !allow_early_reference {
            return Ok(None);
        }

        let factory = self.singleton_factories.lock().get(name).cloned();
        match factory {
            Some(factory) => {
                // 工厂失败时保留在三级缓存中
                let early = factory()?;
                self.early_singleton_objects
                    .lock()
                    .insert(name.to_string(), early.clone());
                self.singleton_factories.lock().remove(name);
                Ok(Some(early))
            }
            None => Ok(None),
        }
    }

    /// 取单例，不存在时用 factory 创建并注册
    pub fn get_or_create_singleton<F>(&self, name: &str, factory: F) -> ContainerResult<BeanObject>
    where
        F: FnOnce() -> ContainerResult<BeanObject>,
    {
        let _guard = self.singleton_lock.lock();
        if let Some(singleton) = self.singleton_objects.read().get(name).cloned() {
            return Ok(singleton);
        }
        if self.in_destruction.load(Ordering::SeqCst) {
            return Err(ContainerError::BeanCreationNotAllowed {
                bean: name.to_string(),
                message: "Singleton bean creation not allowed while singletons of this factory are in destruction (Do not request a bean from a BeanFactory in a destroy method implementation!)".to_string(),
            });
        }
        tracing::debug!("Creating shared instance of singleton bean '{}'", name);

        self.before_singleton_creation(name)?;
        let record_suppressed = {
            let mut suppressed = self.suppressed_errors.lock();
            if suppressed.is_none() {
                *suppressed = Some(Vec::new());
                true
            } else {
                false
            }
        };

        let outcome = match factory() {
            Ok(singleton) => Ok((singleton, true)),
            // 创建过程中单例可能已经被隐式注册
            Err(ContainerError::IllegalState(message)) => {
                match self.singleton_objects.read().get(name).cloned() {
                    Some(singleton) => Ok((singleton, false)),
                    None => Err(ContainerError::IllegalState(message)),
                }
            }
            Err(err) if record_suppressed && err.is_creation_failure() => {
                let related = self
                    .suppressed_errors
                    .lock()
                    .as_mut()
                    .map(std::mem::take)
                    .unwrap_or_default();
                Err(err.with_related(related))
            }
            Err(err) => Err(err),
        };

        if record_suppressed {
            *self.suppressed_errors.lock() = None;
        }
        self.after_singleton_creation(name)?;

        let (singleton, new_singleton) = outcome?;
        if new_singleton {
            self.add_singleton(name, singleton.clone());
        }
        Ok(singleton)
    }

    /// 记录创建单例期间被吞掉的错误
    pub fn on_suppressed_error(&self, error: &ContainerError) {
        let mut suppressed = self.suppressed_errors.lock();
        if let Some(errors) = suppressed.as_mut() {
            if errors.len() < SUPPRESSED_ERRORS_LIMIT {
                errors.push(error.to_string());
            }
        }
    }

    /// 从所有缓存中移除单例
    pub fn remove_singleton(&self, name: &str) {
        let _guard = self.singleton_lock.lock();
        self.singleton_objects.write().remove(name);
        self.singleton_factories.lock().remove(name);
        self.early_singleton_objects.lock().remove(name);
        self.registered_singletons.lock().retain(|n| n != name);
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singleton_objects.read().contains_key(name)
    }

    pub fn singleton_names(&self) -> Vec<String> {
        let _guard = self.singleton_lock.lock();
        self.registered_singletons.lock().clone()
    }

    pub fn singleton_count(&self) -> usize {
        let _guard = self.singleton_lock.lock();
        self.registered_singletons.lock().len()
    }

    /// 把名称加入 / 移出创建检查的排除集合
    pub fn set_currently_in_creation(&self, name: &str, in_creation: bool) {
        let mut exclusions = self.in_creation_check_exclusions.lock();
        if in_creation {
            exclusions.remove(name);
        } else {
            exclusions.insert(name.to_string());
        }
    }

    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        !self.in_creation_check_exclusions.lock().contains(name)
            && self.is_singleton_currently_in_creation(name)
    }

    pub fn is_singleton_currently_in_creation(&self, name: &str) -> bool {
        self.singletons_in_creation.lock().contains(name)
    }

    fn before_singleton_creation(&self, name: &str) -> ContainerResult<()> {
        if self.in_creation_check_exclusions.lock().contains(name) {
            return Ok(());
        }
        if !self.singletons_in_creation.lock().insert(name.to_string()) {
            return Err(ContainerError::BeanCurrentlyInCreation {
                bean: name.to_string(),
                message: "Requested bean is currently in creation: Is there an unresolvable circular reference?".to_string(),
            });
        }
        Ok(())
    }

    fn after_singleton_creation(&self, name: &str) -> ContainerResult<()> {
        if self.in_creation_check_exclusions.lock().contains(name) {
            return Ok(());
        }
        if !self.singletons_in_creation.lock().remove(name) {
            return Err(ContainerError::IllegalState(format!(
                "Singleton '{}' isn't currently in creation",
                name
            )));
        }
        Ok(())
    }

    /// 注册需要在容器关闭时销毁的 Bean
    pub fn register_disposable_bean(&self, name: &str, bean: Arc<dyn DisposableBean>) {
        let mut disposables = self.disposable_beans.lock();
        match disposables.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = bean,
            None => disposables.push((name.to_string(), bean)),
        }
    }

    /// 内部 Bean 随外部 Bean 一起销毁
    pub fn register_contained_bean(&self, contained: &str, containing: &str) {
        let added = {
            let mut contained_map = self.contained_bean_map.lock();
            push_unique(
                contained_map.entry(containing.to_string()).or_default(),
                contained,
            )
        };
        if added {
            self.register_dependent_bean(contained, containing);
        }
    }

    /// 记录 dependent 依赖 bean
    pub fn register_dependent_bean(&self, bean: &str, dependent: &str) {
        let canonical = self.canonical_name(bean);
        {
            let mut dependents = self.dependent_bean_map.lock();
            if !push_unique(dependents.entry(canonical.clone()).or_default(), dependent) {
                return;
            }
        }
        let mut dependencies = self.dependencies_for_bean_map.lock();
        push_unique(
            dependencies.entry(dependent.to_string()).or_default(),
            &canonical,
        );
    }

    /// dependent 是否直接或间接依赖 bean
    pub fn is_dependent(&self, bean: &str, dependent: &str) -> bool {
        let dependents = self.dependent_bean_map.lock().clone();
        let mut already_seen = HashSet::new();
        self.is_dependent_in(&dependents, bean, dependent, &mut already_seen)
    }

    fn is_dependent_in(
        &self,
        dependents: &HashMap<String, Vec<String>>,
        bean: &str,
        dependent: &str,
        already_seen: &mut HashSet<String>,
    ) -> bool {
        if already_seen.contains(bean) {
            return false;
        }
        let canonical = self.canonical_name(bean);
        let direct = match dependents.get(&canonical) {
            Some(direct) => direct,
            None => return false,
        };
        if direct.iter().any(|d| d == dependent) {
            return true;
        }
        already_seen.insert(bean.to_string());
        direct
            .iter()
            .any(|transitive| self.is_dependent_in(dependents, transitive, dependent, already_seen))
    }

    pub fn has_dependent_bean(&self, name: &str) -> bool {
        self.dependent_bean_map
            .lock()
            .get(name)
            .map_or(false, |d| !d.is_empty())
    }

    /// 依赖 name 的 Bean
    pub fn get_dependent_beans(&self, name: &str) -> Vec<String> {
        self.dependent_bean_map
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// name 依赖的 Bean
    pub fn get_dependencies_for_bean(&self, name: &str) -> Vec<String> {
        self.dependencies_for_bean_map
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// 销毁所有单例，按注册的逆序
    pub fn destroy_singletons(&self) {
        tracing::debug!("Destroying singletons in {:p}", self);
        {
            let _guard = self.singleton_lock.lock();
            self.in_destruction.store(true, Ordering::SeqCst);
        }

        let names: Vec<String> = self
            .disposable_beans
            .lock()
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        for name in names.iter().rev() {
            self.destroy_singleton(name);
        }

        self.contained_bean_map.lock().clear();
        self.dependent_bean_map.lock().clear();
        self.dependencies_for_bean_map.lock().clear();

        let _guard = self.singleton_lock.lock();
        self.singleton_objects.write().clear();
        self.singleton_factories.lock().clear();
        self.early_singleton_objects.lock().clear();
        self.registered_singletons.lock().clear();
        self.in_destruction.store(false, Ordering::SeqCst);
    }

    /// 销毁单个单例：先销毁依赖它的 Bean
    pub fn destroy_singleton(&self, name: &str) {
        self.remove_singleton(name);

        let disposable = {
            let mut disposables = self.disposable_beans.lock();
            disposables
                .iter()
                .position(|(n, _)| n == name)
                .map(|pos| disposables.remove(pos).1)
        };
        self.destroy_bean(name, disposable);
    }

    fn destroy_bean(&self, name: &str, bean: Option<Arc<dyn DisposableBean>>) {
        let dependents = self.dependent_bean_map.lock().remove(name);
        if let Some(dependents) = dependents {
            tracing::debug!(
                "Retrieved dependent beans for bean '{}': {:?}",
                name,
                dependents
            );
            for dependent in &dependents {
                self.destroy_singleton(dependent);
            }
        }

        if let Some(bean) = bean {
            if let Err(e) = bean.destroy() {
                tracing::error!(
                    "Destroy method on bean with name '{}' threw an exception: {}",
                    name,
                    e
                );
            }
        }

        let contained = self.contained_bean_map.lock().remove(name);
        if let Some(contained) = contained {
            for inner in &contained {
                self.destroy_singleton(inner);
            }
        }

        self.dependent_bean_map.lock().retain(|_, dependents| {
            dependents.retain(|d| d != name);
            !dependents.is_empty()
        });
        self.dependencies_for_bean_map.lock().remove(name);
    }

    pub(crate) fn is_in_destruction(&self) -> bool {
        self.in_destruction.load(Ordering::SeqCst)
    }
}

impl AliasRegistry for DefaultSingletonBeanRegistry {
    fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()> {
        self.aliases.register_alias(name, alias)
    }

    fn remove_alias(&self, alias: &str) -> ContainerResult<()> {
        self.aliases.remove_alias(alias)
    }

    fn is_alias(&self, name: &str) -> bool {
        self.aliases.is_alias(name)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        self.aliases.get_aliases(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Recorder {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl DisposableBean for Recorder {
        fn destroy(&self) -> ContainerResult<()> {
            self.log.lock().push(self.name.clone());
            Ok(())
        }
    }

    fn recorder(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn DisposableBean> {
        Arc::new(Recorder {
            name: name.to_string(),
            log: log.clone(),
        })
    }

    fn obj(v: &str) -> BeanObject {
        Arc::new(v.to_string())
    }

    #[test]
    fn test_register_singleton_rejects_duplicates() {
        let registry = DefaultSingletonBeanRegistry::new();
        registry.register_singleton("a", obj("a")).unwrap();
        assert!(registry.register_singleton("a", obj("b")).is_err());
        assert!(registry.contains_singleton("a"));
        assert_eq!(registry.singleton_names(), vec!["a".to_string()]);
        assert_eq!(registry.singleton_count(), 1);
    }

    #[test]
    fn test_early_reference_promoted_from_factory() {
        let registry = DefaultSingletonBeanRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let result = registry.get_or_create_singleton("a", || {
            let raw = obj("raw-a");
            let counter = calls.clone();
            let early = raw.clone();
            registry.add_singleton_factory(
                "a",
                Arc::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(early.clone())
                }),
            );

            // 不允许早期引用时看不到三级缓存
            assert!(registry.get_singleton("a", false).unwrap().is_none());

            let first = registry.get_singleton("a", true).unwrap().unwrap();
            let second = registry.get_singleton("a", true).unwrap().unwrap();
            assert!(Arc::ptr_eq(&first, &second));
            assert!(registry.get_singleton("a", false).unwrap().is_some());
            Ok(raw)
        });

        let singleton = result.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(singleton.downcast_ref::<String>().unwrap(), "raw-a");
        assert!(registry.early_singleton_objects.lock().is_empty());
        assert!(registry.singleton_factories.lock().is_empty());
        assert!(!registry.is_singleton_currently_in_creation("a"));
    }

    #[test]
    fn test_get_singleton_ignores_factories_outside_creation() {
        let registry = DefaultSingletonBeanRegistry::new();
        registry.add_singleton_factory("a", Arc::new(|| Ok(obj("a"))));
        assert!(registry.get_singleton("a", true).unwrap().is_none());
    }

    #[test]
    fn test_failing_early_reference_factory_is_kept() {
        let registry = DefaultSingletonBeanRegistry::new();
        let attempts = Arc::new(AtomicUsize::new(0));

        let result = registry.get_or_create_singleton("a", || {
            let counter = attempts.clone();
            registry.add_singleton_factory(
                "a",
                Arc::new(move || {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ContainerError::creation("a", "proxy not ready"))
                    } else {
                        Ok(obj("early-a"))
                    }
                }),
            );

            assert!(registry.get_singleton("a", true).is_err());
            assert!(registry.singleton_factories.lock().contains_key("a"));
            assert!(registry.early_singleton_objects.lock().is_empty());

            let early = registry.get_singleton("a", true).unwrap().unwrap();
            assert_eq!(early.downcast_ref::<String>().unwrap(), "early-a");
            assert!(!registry.singleton_factories.lock().contains_key("a"));
            Ok(early)
        });

        assert_eq!(result.unwrap().downcast_ref::<String>().unwrap(), "early-a");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reentrant_creation_detected() {
        let registry = DefaultSingletonBeanRegistry::new();
        let err = registry
            .get_or_create_singleton("a", || {
                registry.get_or_create_singleton("a", || Ok(obj("inner")))
            })
            .unwrap_err();
        assert!(err.is_currently_in_creation());
        assert!(!registry.is_singleton_currently_in_creation("a"));
        assert!(!registry.contains_singleton("a"));
    }

    #[test]
    fn test_suppressed_errors_attached_as_related_causes() {
        let registry = DefaultSingletonBeanRegistry::new();
        let err = registry
            .get_or_create_singleton("a", || {
                registry.on_suppressed_error(&ContainerError::creation("b", "first attempt"));
                Err(ContainerError::creation("a", "failed"))
            })
            .unwrap_err();
        assert!(err.to_string().contains("first attempt"));
        assert!(registry.suppressed_errors.lock().is_none());
    }

    #[test]
    fn test_illegal_state_with_implicit_singleton() {
        let registry = DefaultSingletonBeanRegistry::new();
        let singleton = registry
            .get_or_create_singleton("a", || {
                registry.add_singleton("a", obj("implicit"));
                Err(ContainerError::IllegalState("already there".to_string()))
            })
            .unwrap();
        assert_eq!(singleton.downcast_ref::<String>().unwrap(), "implicit");
    }

    #[test]
    fn test_creation_rejected_during_destruction() {
        let registry = DefaultSingletonBeanRegistry::new();
        registry.in_destruction.store(true, Ordering::SeqCst);
        let err = registry
            .get_or_create_singleton("a", || Ok(obj("a")))
            .unwrap_err();
        assert!(matches!(err, ContainerError::BeanCreationNotAllowed { .. }));
    }

    #[test]
    fn test_in_creation_exclusions() {
        let registry = DefaultSingletonBeanRegistry::new();
        registry.set_currently_in_creation("a", false);
        let value = registry
            .get_or_create_singleton("a", || {
                assert!(!registry.is_currently_in_creation("a"));
                Ok(obj("a"))
            })
            .unwrap();
        assert!(value.downcast_ref::<String>().is_some());
    }

    #[test]
    fn test_is_dependent_transitive_and_cycle_safe() {
        let registry = DefaultSingletonBeanRegistry::new();
        registry.register_dependent_bean("a", "b");
        registry.register_dependent_bean("b", "c");
        registry.register_dependent_bean("c", "a");
        assert!(registry.is_dependent("a", "b"));
        assert!(registry.is_dependent("a", "c"));
        assert!(!registry.is_dependent("a", "x"));
        assert_eq!(registry.get_dependencies_for_bean("c"), vec!["b".to_string()]);
    }

    #[test]
    fn test_register_dependent_bean_uses_canonical_name() {
        let registry = DefaultSingletonBeanRegistry::new();
        registry.register_alias("dataSource", "ds").unwrap();
        registry.register_dependent_bean("ds", "repo");
        assert_eq!(
            registry.get_dependent_beans("dataSource"),
            vec!["repo".to_string()]
        );
        assert!(registry.has_dependent_bean("dataSource"));
    }

    #[test]
    fn test_destroy_dependents_first_then_reverse_order() {
        let registry = DefaultSingletonBeanRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["db", "repo", "service", "cache"] {
            registry.register_singleton(name, obj(name)).unwrap();
        }
        registry.register_disposable_bean("service", recorder("service", &log));
        registry.register_disposable_bean("db", recorder("db", &log));
        registry.register_disposable_bean("repo", recorder("repo", &log));
        registry.register_disposable_bean("cache", recorder("cache", &log));
        registry.register_dependent_bean("db", "repo");
        registry.register_dependent_bean("repo", "service");

        registry.destroy_singletons();

        // cache 最后注册最先销毁；repo 销毁前先销毁依赖它的 service；db 最后
        assert_eq!(
            *log.lock(),
            vec!["cache", "service", "repo", "db"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
        assert_eq!(registry.singleton_count(), 0);
        assert!(!registry.is_in_destruction());
    }

    #[test]
    fn test_destroy_singleton_cascades_to_contained_beans() {
        let registry = DefaultSingletonBeanRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register_singleton("outer", obj("outer")).unwrap();
        registry.register_singleton("inner#0", obj("inner")).unwrap();
        registry.register_disposable_bean("outer", recorder("outer", &log));
        registry.register_disposable_bean("inner#0", recorder("inner#0", &log));
        registry.register_contained_bean("inner#0", "outer");

        registry.destroy_singleton("outer");
        assert_eq!(*log.lock(), vec!["outer".to_string(), "inner#0".to_string()]);
        assert!(!registry.contains_singleton("inner#0"));
        assert!(registry.get_dependent_beans("inner#0").is_empty());
    }

    #[test]
    fn test_destroy_errors_are_logged_not_propagated() {
        struct Failing;
        impl DisposableBean for Failing {
            fn destroy(&self) -> ContainerResult<()> {
                Err(ContainerError::IllegalState("boom".to_string()))
            }
        }

        let registry = DefaultSingletonBeanRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register_singleton("a", obj("a")).unwrap();
        registry.register_singleton("b", obj("b")).unwrap();
        registry.register_disposable_bean("a", recorder("a", &log));
        registry.register_disposable_bean("b", Arc::new(Failing));

        registry.destroy_singletons();
        assert_eq!(*log.lock(), vec!["a".to_string()]);
    }

    #[test]
    fn test_concurrent_creation_yields_single_instance() {
        let registry = Arc::new(DefaultSingletonBeanRegistry::new());
        let created = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let created = created.clone();
                std::thread::spawn(move || {
                    registry
                        .get_or_create_singleton("shared", || {
                            created.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(5));
                            Ok(obj("shared"))
                        })
                        .unwrap()
                })
            })
            .collect();

        let instances: Vec<BeanObject> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
