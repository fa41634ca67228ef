//! Bean 工厂的端到端场景：循环引用、构造函数解析、工厂方法、销毁顺序

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use arbor_beans::{
    AutowireMode, BeanClass, BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryExt,
    BeanObject, BeanPostProcessor, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
    DefaultListableBeanFactory, ListableBeanFactory, ParamSpec, Scope,
    SmartInstantiationAwareBeanPostProcessor, Value,
};
use arbor_core::{AliasRegistry, ContainerError, ContainerResult, Environment, MapPropertySource};

type Log = Arc<Mutex<Vec<String>>>;

// ---------- 属性注入的循环引用 ----------

struct Alpha {
    label: String,
    beta: Mutex<Option<Arc<Beta>>>,
}

struct Beta {
    alpha: Mutex<Option<Arc<Alpha>>>,
}

fn alpha_class() -> Arc<BeanClass> {
    BeanClass::builder::<Alpha>("Alpha")
        .default_constructor(|| Alpha {
            label: "raw".to_string(),
            beta: Mutex::new(None),
        })
        .property("beta", |a: &Alpha, b: Arc<Beta>| {
            *a.beta.lock() = Some(b);
            Ok(())
        })
        .build()
}

fn beta_class() -> Arc<BeanClass> {
    BeanClass::builder::<Beta>("Beta")
        .default_constructor(|| Beta {
            alpha: Mutex::new(None),
        })
        .property("alpha", |b: &Beta, a: Arc<Alpha>| {
            *b.alpha.lock() = Some(a);
            Ok(())
        })
        .build()
}

fn circular_factory() -> DefaultListableBeanFactory {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "alpha",
            BeanDefinition::of_class(alpha_class()).with_property("beta", Value::reference("beta")),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "beta",
            BeanDefinition::of_class(beta_class()).with_property("alpha", Value::reference("alpha")),
        )
        .unwrap();
    factory
}

#[test]
fn property_cycle_is_resolved_through_early_reference() {
    let factory = circular_factory();

    let alpha = factory.get_bean_of::<Alpha>("alpha").unwrap();
    let beta = factory.get_bean_of::<Beta>("beta").unwrap();

    let injected_beta = alpha.beta.lock().clone().unwrap();
    let injected_alpha = beta.alpha.lock().clone().unwrap();
    assert!(Arc::ptr_eq(&injected_beta, &beta));
    assert!(Arc::ptr_eq(&injected_alpha, &alpha));

    assert_eq!(factory.get_dependent_beans("alpha"), vec!["beta".to_string()]);
    assert_eq!(factory.get_dependencies_for_bean("alpha"), vec!["beta".to_string()]);
}

#[test]
fn property_cycle_fails_when_circular_references_disabled() {
    let factory = circular_factory();
    factory.set_allow_circular_references(false);

    let err = factory.get_bean("alpha").unwrap_err();
    assert!(err.is_currently_in_creation(), "unexpected error: {}", err);
    assert!(!factory.contains_singleton("alpha"));
    assert!(!factory.contains_singleton("beta"));
}

#[test]
fn prototype_cycle_is_rejected() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "alpha",
            BeanDefinition::of_class(alpha_class())
                .with_scope(Scope::Prototype)
                .with_property("beta", Value::reference("beta")),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "beta",
            BeanDefinition::of_class(beta_class())
                .with_scope(Scope::Prototype)
                .with_property("alpha", Value::reference("alpha")),
        )
        .unwrap();

    let err = factory.get_bean("alpha").unwrap_err();
    assert!(err.is_currently_in_creation(), "unexpected error: {}", err);
    assert!(!factory.is_currently_in_creation("alpha"));
}

// ---------- 早期引用与包装 ----------

/// 对 alpha 做“代理”：同类型的另一个实例
struct ProxyingProcessor {
    early_proxied: Mutex<HashSet<String>>,
    consistent: bool,
}

impl ProxyingProcessor {
    fn proxy(bean: &BeanObject) -> BeanObject {
        let beta = bean
            .downcast_ref::<Alpha>()
            .and_then(|a| a.beta.lock().clone());
        Arc::new(Alpha {
            label: "proxy".to_string(),
            beta: Mutex::new(beta),
        })
    }
}

impl BeanPostProcessor for ProxyingProcessor {
    fn post_process_after_initialization(&self, bean: BeanObject, bean_name: &str) -> ContainerResult<BeanObject> {
        if bean_name != "alpha" {
            return Ok(bean);
        }
        if self.consistent && self.early_proxied.lock().contains(bean_name) {
            // 早期引用已经是代理，交给容器换成早期引用
            return Ok(bean);
        }
        Ok(Self::proxy(&bean))
    }

    fn as_smart_instantiation_aware(&self) -> Option<&dyn SmartInstantiationAwareBeanPostProcessor> {
        Some(self)
    }
}

impl SmartInstantiationAwareBeanPostProcessor for ProxyingProcessor {
    fn get_early_bean_reference(&self, bean: BeanObject, bean_name: &str) -> ContainerResult<BeanObject> {
        if !self.consistent || bean_name != "alpha" {
            return Ok(bean);
        }
        self.early_proxied.lock().insert(bean_name.to_string());
        Ok(Self::proxy(&bean))
    }
}

#[test]
fn wrapping_after_raw_injection_is_an_error() {
    let factory = circular_factory();
    factory.add_bean_post_processor(Arc::new(ProxyingProcessor {
        early_proxied: Mutex::new(HashSet::new()),
        consistent: false,
    }));

    let err = factory.get_bean("alpha").unwrap_err();
    assert!(matches!(err, ContainerError::BeanCurrentlyInCreation { .. }));
    assert!(err.to_string().contains("in its raw version"));
}

#[test]
fn raw_injection_can_be_allowed() {
    let factory = circular_factory();
    factory.set_allow_raw_injection_despite_wrapping(true);
    factory.add_bean_post_processor(Arc::new(ProxyingProcessor {
        early_proxied: Mutex::new(HashSet::new()),
        consistent: false,
    }));

    let alpha = factory.get_bean_of::<Alpha>("alpha").unwrap();
    assert_eq!(alpha.label, "proxy");
    let beta = factory.get_bean_of::<Beta>("beta").unwrap();
    assert_eq!(beta.alpha.lock().as_ref().unwrap().label, "raw");
}

#[test]
fn early_proxy_is_the_final_singleton() {
    let factory = circular_factory();
    factory.add_bean_post_processor(Arc::new(ProxyingProcessor {
        early_proxied: Mutex::new(HashSet::new()),
        consistent: true,
    }));

    let alpha = factory.get_bean_of::<Alpha>("alpha").unwrap();
    let beta = factory.get_bean_of::<Beta>("beta").unwrap();
    assert_eq!(alpha.label, "proxy");
    assert!(Arc::ptr_eq(beta.alpha.lock().as_ref().unwrap(), &alpha));
}

// ---------- 构造函数解析 ----------

struct Engine {
    id: usize,
}

struct Car {
    engine: Arc<Engine>,
}

struct Label {
    kind: &'static str,
}

fn engine_class() -> Arc<BeanClass> {
    static NEXT: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);
    BeanClass::builder::<Engine>("Engine")
        .default_constructor(|| Engine {
            id: NEXT.fetch_add(1, std::sync::atomic::Ordering::SeqCst),
        })
        .build()
}

fn car_class() -> Arc<BeanClass> {
    BeanClass::builder::<Car>("Car")
        .constructor(vec![ParamSpec::of::<Engine>().named("engine")], |args| {
            Ok(Car {
                engine: args.get::<Engine>(0)?,
            })
        })
        .build()
}

fn label_class() -> Arc<BeanClass> {
    BeanClass::builder::<Label>("Label")
        .constructor(vec![ParamSpec::of::<String>().named("text")], |_| Ok(Label { kind: "text" }))
        .constructor(vec![ParamSpec::any().named("value")], |_| Ok(Label { kind: "any" }))
        .build()
}

#[test]
fn single_constructor_is_autowired_by_type() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition("engine", BeanDefinition::of_class(engine_class()))
        .unwrap();
    factory
        .register_bean_definition("car", BeanDefinition::of_class(car_class()))
        .unwrap();

    let car = factory.get_bean_of::<Car>("car").unwrap();
    let engine = factory.get_bean_of::<Engine>("engine").unwrap();
    assert!(Arc::ptr_eq(&car.engine, &engine));
    assert_eq!(factory.get_dependent_beans("engine"), vec!["car".to_string()]);
}

#[test]
fn constructor_cycle_cannot_be_resolved() {
    struct Left;
    struct Right;
    let left = BeanClass::builder::<Left>("Left")
        .constructor(vec![ParamSpec::of::<Right>()], |_| Ok(Left))
        .build();
    let right = BeanClass::builder::<Right>("Right")
        .constructor(vec![ParamSpec::of::<Left>()], |_| Ok(Right))
        .build();

    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("left", BeanDefinition::of_class(left)).unwrap();
    factory.register_bean_definition("right", BeanDefinition::of_class(right)).unwrap();

    let err = factory.get_bean("left").unwrap_err();
    assert!(err.is_currently_in_creation(), "unexpected error: {}", err);
    assert_eq!(factory.get_singleton_count(), 0);
}

#[test]
fn lenient_resolution_prefers_closest_constructor() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "label",
            BeanDefinition::of_class(label_class()).with_constructor_arg("hello"),
        )
        .unwrap();
    assert_eq!(factory.get_bean_of::<Label>("label").unwrap().kind, "text");
}

#[test]
fn strict_resolution_reports_ambiguous_constructors() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "label",
            BeanDefinition::of_class(label_class())
                .with_constructor_arg("hello")
                .with_lenient_constructor_resolution(false),
        )
        .unwrap();

    let err = factory.get_bean("label").unwrap_err();
    assert!(err.to_string().contains("Ambiguous constructor matches"), "{}", err);
}

#[test]
fn prototype_reference_arguments_are_resolved_per_instance() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "engine",
            BeanDefinition::of_class(engine_class()).with_scope(Scope::Prototype),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "car",
            BeanDefinition::of_class(car_class())
                .with_scope(Scope::Prototype)
                .with_constructor_arg(Value::reference("engine")),
        )
        .unwrap();

    let first = factory.get_bean_of::<Car>("car").unwrap();
    let second = factory.get_bean_of::<Car>("car").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_ne!(first.engine.id, second.engine.id);
}

#[test]
fn explicit_arguments_select_constructor() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "car",
            BeanDefinition::of_class(car_class()).with_scope(Scope::Prototype),
        )
        .unwrap();

    let engine: BeanObject = Arc::new(Engine { id: 99 });
    let car = factory.get_bean_with_args("car", vec![Some(engine)]).unwrap();
    assert_eq!(car.downcast_ref::<Car>().unwrap().engine.id, 99);
}

// ---------- 工厂方法 ----------

struct Connection {
    url: String,
}

struct ConnectionFactory {
    prefix: String,
}

fn connection_factory_class() -> Arc<BeanClass> {
    BeanClass::builder::<ConnectionFactory>("ConnectionFactory")
        .default_constructor(|| ConnectionFactory {
            prefix: "pool:".to_string(),
        })
        .static_factory::<Connection, _>("create", vec![ParamSpec::of::<String>()], |args| {
            Ok(Connection {
                url: args.value::<String>(0)?,
            })
        })
        .instance_factory::<Connection, _>("open", vec![], |f: &ConnectionFactory, _| {
            Ok(Connection {
                url: format!("{}default", f.prefix),
            })
        })
        .static_factory::<(), _>("reset", vec![], |_| Ok(()))
        .build()
}

#[test]
fn static_and_instance_factory_methods() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "direct",
            BeanDefinition::of_class(connection_factory_class())
                .with_factory_method("create")
                .with_constructor_arg("db://main"),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "connectionFactory",
            BeanDefinition::of_class(connection_factory_class()),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "pooled",
            BeanDefinition::new()
                .with_factory_bean("connectionFactory")
                .with_factory_method("open"),
        )
        .unwrap();

    assert_eq!(factory.get_bean_of::<Connection>("direct").unwrap().url, "db://main");
    assert_eq!(factory.get_bean_of::<Connection>("pooled").unwrap().url, "pool:default");

    // 类型预测基于工厂方法的返回类型
    assert_eq!(
        factory.get_bean_names_for_type(TypeId::of::<Connection>()),
        vec!["direct".to_string(), "pooled".to_string()]
    );
    assert_eq!(
        factory.get_dependent_beans("connectionFactory"),
        Vec::<String>::new(),
        "factory-bean is not a depends-on relationship"
    );
}

#[test]
fn factory_method_errors() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "missing",
            BeanDefinition::of_class(connection_factory_class()).with_factory_method("build"),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "unit",
            BeanDefinition::of_class(connection_factory_class()).with_factory_method("reset"),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "selfish",
            BeanDefinition::new()
                .with_factory_bean("selfish")
                .with_factory_method("open"),
        )
        .unwrap();

    let missing = factory.get_bean("missing").unwrap_err();
    assert!(missing.to_string().contains("No matching factory method found"), "{}", missing);

    let unit = factory.get_bean("unit").unwrap_err();
    assert!(unit.to_string().contains("non-void return type"), "{}", unit);

    let selfish = factory.get_bean("selfish").unwrap_err();
    assert!(matches!(selfish, ContainerError::BeanDefinitionStore { .. }));
}

/// 工厂 Bean 初始化完成时顺带注册 "pooled"
struct EagerPoolRegistration {
    factory: Weak<DefaultListableBeanFactory>,
}

impl BeanPostProcessor for EagerPoolRegistration {
    fn post_process_after_initialization(&self, bean: BeanObject, name: &str) -> ContainerResult<BeanObject> {
        if name == "connectionFactory" {
            if let Some(factory) = self.factory.upgrade() {
                factory.register_singleton(
                    "pooled",
                    Arc::new(Connection {
                        url: "pool:preset".to_string(),
                    }),
                )?;
            }
        }
        Ok(bean)
    }
}

#[test]
fn singleton_registered_by_its_factory_bean_is_kept() {
    let factory = Arc::new(DefaultListableBeanFactory::new());
    factory.add_bean_post_processor(Arc::new(EagerPoolRegistration {
        factory: Arc::downgrade(&factory),
    }));
    factory
        .register_bean_definition(
            "connectionFactory",
            BeanDefinition::of_class(connection_factory_class()),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "pooled",
            BeanDefinition::new()
                .with_factory_bean("connectionFactory")
                .with_factory_method("open"),
        )
        .unwrap();

    let pooled = factory.get_bean_of::<Connection>("pooled").unwrap();
    assert_eq!(pooled.url, "pool:preset");
    assert!(factory.contains_singleton("pooled"));
    assert!(!factory.is_currently_in_creation("pooled"));
    assert!(Arc::ptr_eq(&pooled, &factory.get_bean_of::<Connection>("pooled").unwrap()));
}

// ---------- 依赖与销毁 ----------

struct Resource {
    name: &'static str,
    log: Log,
}

fn resource_definition(name: &'static str, log: &Log) -> BeanDefinition {
    let log = log.clone();
    BeanDefinition::from_supplier(move || {
        Ok(Resource {
            name,
            log: log.clone(),
        })
    })
    .with_destroy(|r: &Resource| {
        r.log.lock().push(r.name.to_string());
        Ok(())
    })
}

fn layered_factory(log: &Log) -> DefaultListableBeanFactory {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition("database", resource_definition("database", log))
        .unwrap();
    factory
        .register_bean_definition(
            "repository",
            resource_definition("repository", log).with_depends_on(["database"]),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "service",
            resource_definition("service", log).with_depends_on(["repository"]),
        )
        .unwrap();
    factory
}

#[test]
fn singletons_destroyed_dependents_first() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let factory = layered_factory(&log);
    // 从最上层开始创建，注册顺序与创建完成顺序不同
    factory.get_bean("service").unwrap();
    assert_eq!(factory.get_singleton_count(), 3);

    factory.destroy_singletons();
    assert_eq!(
        *log.lock(),
        vec!["service".to_string(), "repository".to_string(), "database".to_string()]
    );
    assert_eq!(factory.get_singleton_count(), 0);
}

#[test]
fn destroying_one_singleton_takes_its_dependents() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let factory = layered_factory(&log);
    factory.preinstantiate_singletons().unwrap();

    factory.destroy_singleton("database");
    assert_eq!(
        *log.lock(),
        vec!["service".to_string(), "repository".to_string(), "database".to_string()]
    );
    assert!(!factory.contains_singleton("service"));
}

#[test]
fn circular_depends_on_is_rejected() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition("a", resource_definition("a", &log).with_depends_on(["b"]))
        .unwrap();
    factory
        .register_bean_definition("b", resource_definition("b", &log).with_depends_on(["a"]))
        .unwrap();

    let err = factory.get_bean("a").unwrap_err();
    assert!(err.to_string().contains("Circular depends-on relationship"), "{}", err);

    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition("a", resource_definition("a", &log).with_depends_on(["ghost"]))
        .unwrap();
    let err = factory.get_bean("a").unwrap_err();
    assert!(err.to_string().contains("depends on missing bean 'ghost'"), "{}", err);
}

#[test]
fn prototypes_are_not_destroyed_by_the_container() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "temp",
            resource_definition("temp", &log).with_scope(Scope::Prototype),
        )
        .unwrap();

    let bean = factory.get_bean("temp").unwrap();
    factory.destroy_singletons();
    assert!(log.lock().is_empty());

    factory.destroy_bean("temp", bean).unwrap();
    assert_eq!(*log.lock(), vec!["temp".to_string()]);
}

// ---------- 按类型查找 ----------

struct Store {
    name: &'static str,
}

fn store(name: &'static str) -> BeanDefinition {
    BeanDefinition::from_supplier(move || Ok(Store { name }))
}

#[test]
fn primary_candidate_wins() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("disk", store("disk")).unwrap();
    factory
        .register_bean_definition("memory", store("memory").with_primary(true))
        .unwrap();

    assert_eq!(factory.get_bean_by_type::<Store>().unwrap().name, "memory");
    let all = factory.get_beans_of_type::<Store>().unwrap();
    let names: Vec<&str> = all.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["disk", "memory"]);
}

#[test]
fn multiple_candidates_without_primary_are_ambiguous() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("disk", store("disk")).unwrap();
    factory.register_bean_definition("memory", store("memory")).unwrap();
    factory
        .register_bean_definition("hidden", store("hidden").with_autowire_candidate(false))
        .unwrap();

    match factory.get_bean_by_type::<Store>() {
        Err(ContainerError::NoUniqueBeanDefinition { candidates, .. }) => {
            assert_eq!(candidates, vec!["disk".to_string(), "memory".to_string()]);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(store) => panic!("expected ambiguity, got '{}'", store.name),
    }
}

#[test]
fn parameter_name_breaks_ties() {
    struct Cache {
        store: Arc<Store>,
    }
    let cache = BeanClass::builder::<Cache>("Cache")
        .constructor(vec![ParamSpec::of::<Store>().named("memoryStore")], |args| {
            Ok(Cache {
                store: args.get::<Store>(0)?,
            })
        })
        .build();

    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("disk", store("disk")).unwrap();
    factory.register_bean_definition("memory", store("memory")).unwrap();
    factory.register_alias("memory", "memoryStore").unwrap();
    factory.register_bean_definition("cache", BeanDefinition::of_class(cache)).unwrap();

    let cache = factory.get_bean_of::<Cache>("cache").unwrap();
    assert_eq!(cache.store.name, "memory");
}

#[test]
fn type_mismatch_is_reported() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("disk", store("disk")).unwrap();
    let result = factory.get_bean_of::<Engine>("disk");
    assert!(matches!(result, Err(ContainerError::TypeMismatch { .. })));
}

// ---------- 父子定义与占位符 ----------

struct Endpoint {
    url: Mutex<String>,
    timeout: Mutex<i64>,
}

fn endpoint_class() -> Arc<BeanClass> {
    BeanClass::builder::<Endpoint>("Endpoint")
        .default_constructor(|| Endpoint {
            url: Mutex::new(String::new()),
            timeout: Mutex::new(0),
        })
        .property("url", |e: &Endpoint, v: Arc<String>| {
            *e.url.lock() = (*v).clone();
            Ok(())
        })
        .property("timeout", |e: &Endpoint, v: Arc<i64>| {
            *e.timeout.lock() = *v;
            Ok(())
        })
        .build()
}

#[test]
fn child_definition_inherits_and_overrides() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "base",
            BeanDefinition::of_class(endpoint_class())
                .with_abstract(true)
                .with_property("url", "http://base")
                .with_property("timeout", 5i64),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "child",
            BeanDefinition::child("base").with_property("url", "http://child"),
        )
        .unwrap();

    let child = factory.get_bean_of::<Endpoint>("child").unwrap();
    assert_eq!(*child.url.lock(), "http://child");
    assert_eq!(*child.timeout.lock(), 5);
    assert!(matches!(factory.get_bean("base"), Err(ContainerError::BeanIsAbstract(_))));
}

#[test]
fn unresolvable_parent_is_reported() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition("orphan", BeanDefinition::child("nobody"))
        .unwrap();
    let err = factory.get_bean("orphan").unwrap_err();
    assert!(err.to_string().contains("Could not resolve parent bean definition 'nobody'"), "{}", err);
}

#[test]
fn embedded_placeholders_are_resolved_in_property_values() {
    let env = Environment::new();
    env.add_property_source(Box::new(
        MapPropertySource::new("test")
            .with("endpoint.host", "example.org")
            .with("endpoint.timeout", "30"),
    ));

    let factory = DefaultListableBeanFactory::new();
    factory.add_embedded_value_resolver(Arc::new(env));
    factory
        .register_bean_definition(
            "endpoint",
            BeanDefinition::of_class(endpoint_class())
                .with_property("url", "https://${endpoint.host}/api")
                .with_property("timeout", "${endpoint.timeout}"),
        )
        .unwrap();

    let endpoint = factory.get_bean_of::<Endpoint>("endpoint").unwrap();
    assert_eq!(*endpoint.url.lock(), "https://example.org/api");
    assert_eq!(*endpoint.timeout.lock(), 30);
}

#[test]
fn unknown_property_is_rejected() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "endpoint",
            BeanDefinition::of_class(endpoint_class()).with_property("port", 8080i64),
        )
        .unwrap();
    let err = factory.get_bean("endpoint").unwrap_err();
    assert!(err.to_string().contains("Invalid property 'port'"), "{}", err);
}

// ---------- 生命周期回调 ----------

struct Worker {
    log: Log,
}

#[test]
fn initialization_callbacks_run_in_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let class_log = log.clone();
    let worker = BeanClass::builder::<Worker>("Worker")
        .constructor(vec![], move |_| Ok(Worker { log: class_log.clone() }))
        .bean_name_aware(|w: &Worker, name| w.log.lock().push(format!("name:{}", name)))
        .initializing_bean(|w: &Worker| {
            w.log.lock().push("after-properties-set".to_string());
            Ok(())
        })
        .method("start", |w: &Worker| {
            w.log.lock().push("start".to_string());
            Ok(())
        })
        .after_singletons_instantiated(|w: &Worker| {
            w.log.lock().push("all-ready".to_string());
            Ok(())
        })
        .build();

    struct Recording(Log);
    impl BeanPostProcessor for Recording {
        fn post_process_before_initialization(&self, bean: BeanObject, name: &str) -> ContainerResult<BeanObject> {
            self.0.lock().push(format!("before:{}", name));
            Ok(bean)
        }
        fn post_process_after_initialization(&self, bean: BeanObject, name: &str) -> ContainerResult<BeanObject> {
            self.0.lock().push(format!("after:{}", name));
            Ok(bean)
        }
    }

    let factory = DefaultListableBeanFactory::new();
    factory.add_bean_post_processor(Arc::new(Recording(log.clone())));
    factory
        .register_bean_definition(
            "worker",
            BeanDefinition::of_class(worker).with_init_method("start"),
        )
        .unwrap();
    factory.preinstantiate_singletons().unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "name:worker".to_string(),
            "before:worker".to_string(),
            "after-properties-set".to_string(),
            "start".to_string(),
            "after:worker".to_string(),
            "all-ready".to_string(),
        ]
    );
}

#[test]
fn missing_init_method_is_reported() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "engine",
            BeanDefinition::of_class(engine_class()).with_init_method("warmUp"),
        )
        .unwrap();
    let err = factory.get_bean("engine").unwrap_err();
    assert!(err.to_string().contains("Could not find an init method named 'warmUp'"), "{}", err);
}

#[test]
fn lazy_singletons_are_not_preinstantiated() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "engine",
            BeanDefinition::of_class(engine_class()).with_lazy(true),
        )
        .unwrap();
    factory.preinstantiate_singletons().unwrap();
    assert!(!factory.contains_singleton("engine"));
    assert!(factory.contains_bean("engine"));
    assert_eq!(factory.get_type("engine").unwrap(), Some(TypeId::of::<Engine>()));
}

// ---------- 属性自动装配 ----------

struct Mailer {
    tag: &'static str,
}

struct Notifier {
    mailer: Mutex<Option<Arc<Mailer>>>,
    retries: Mutex<i64>,
}

fn notifier_class() -> Arc<BeanClass> {
    BeanClass::builder::<Notifier>("Notifier")
        .default_constructor(|| Notifier {
            mailer: Mutex::new(None),
            retries: Mutex::new(0),
        })
        .property("mailer", |n: &Notifier, m: Arc<Mailer>| {
            *n.mailer.lock() = Some(m);
            Ok(())
        })
        .property("retries", |n: &Notifier, v: Arc<i64>| {
            *n.retries.lock() = *v;
            Ok(())
        })
        .build()
}

fn mailer(tag: &'static str) -> BeanDefinition {
    BeanDefinition::from_supplier(move || Ok(Mailer { tag }))
}

fn injected_tag(notifier: &Notifier) -> Option<&'static str> {
    notifier.mailer.lock().as_ref().map(|m| m.tag)
}

#[test]
fn properties_autowired_by_name() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("mailer", mailer("primary")).unwrap();
    factory.register_bean_definition("backupMailer", mailer("backup")).unwrap();
    factory
        .register_bean_definition(
            "notifier",
            BeanDefinition::of_class(notifier_class()).with_autowire_mode(AutowireMode::ByName),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "explicit",
            BeanDefinition::of_class(notifier_class())
                .with_autowire_mode(AutowireMode::ByName)
                .with_property("mailer", Value::reference("backupMailer")),
        )
        .unwrap();

    let notifier = factory.get_bean_of::<Notifier>("notifier").unwrap();
    assert_eq!(injected_tag(&notifier), Some("primary"));
    // 简单类型的属性不参与自动装配
    assert_eq!(*notifier.retries.lock(), 0);
    assert_eq!(factory.get_dependent_beans("mailer"), vec!["notifier".to_string()]);

    // 显式配置的属性优先
    let explicit = factory.get_bean_of::<Notifier>("explicit").unwrap();
    assert_eq!(injected_tag(&explicit), Some("backup"));
}

#[test]
fn properties_autowired_by_name_skip_missing_beans() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("smtp", mailer("smtp")).unwrap();
    factory
        .register_bean_definition(
            "notifier",
            BeanDefinition::of_class(notifier_class()).with_autowire_mode(AutowireMode::ByName),
        )
        .unwrap();

    let notifier = factory.get_bean_of::<Notifier>("notifier").unwrap();
    assert_eq!(injected_tag(&notifier), None);
}

#[test]
fn properties_autowired_by_type() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("smtp", mailer("smtp")).unwrap();
    factory
        .register_bean_definition(
            "notifier",
            BeanDefinition::of_class(notifier_class()).with_autowire_mode(AutowireMode::ByType),
        )
        .unwrap();

    let notifier = factory.get_bean_of::<Notifier>("notifier").unwrap();
    assert_eq!(injected_tag(&notifier), Some("smtp"));
    assert_eq!(*notifier.retries.lock(), 0);
    assert_eq!(factory.get_dependent_beans("smtp"), vec!["notifier".to_string()]);
}

#[test]
fn ambiguous_property_autowired_by_type_fails() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("smtp", mailer("smtp")).unwrap();
    factory.register_bean_definition("sendmail", mailer("sendmail")).unwrap();
    factory
        .register_bean_definition(
            "notifier",
            BeanDefinition::of_class(notifier_class()).with_autowire_mode(AutowireMode::ByType),
        )
        .unwrap();

    let err = factory.get_bean("notifier").unwrap_err();
    assert!(
        err.to_string().contains("Unsatisfied dependency expressed through bean property 'mailer'"),
        "{}",
        err
    );
    assert!(!factory.contains_singleton("notifier"));
}

// ---------- 内部 Bean ----------

struct Holder {
    part: Mutex<Option<Arc<Resource>>>,
    log: Log,
}

fn holder_class(log: &Log) -> Arc<BeanClass> {
    let log = log.clone();
    BeanClass::builder::<Holder>("Holder")
        .default_constructor(move || Holder {
            part: Mutex::new(None),
            log: log.clone(),
        })
        .property("part", |h: &Holder, r: Arc<Resource>| {
            *h.part.lock() = Some(r);
            Ok(())
        })
        .disposable_bean(|h: &Holder| {
            h.log.lock().push("holder".to_string());
            Ok(())
        })
        .build()
}

#[test]
fn inner_bean_destroyed_with_its_containing_bean() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "holder",
            BeanDefinition::of_class(holder_class(&log))
                .with_property("part", resource_definition("part", &log)),
        )
        .unwrap();

    let holder = factory.get_bean_of::<Holder>("holder").unwrap();
    assert_eq!(holder.part.lock().as_ref().map(|r| r.name), Some("part"));
    // 内部 Bean 不以独立名称暴露
    assert!(factory.get_bean_names_for_type(TypeId::of::<Resource>()).is_empty());
    assert_eq!(factory.get_singleton_count(), 1);

    factory.destroy_singleton("holder");
    assert_eq!(*log.lock(), vec!["holder".to_string(), "part".to_string()]);
    assert!(!factory.contains_singleton("holder"));
}

// ---------- 并发获取 ----------

#[test]
fn concurrent_lookups_share_one_singleton() {
    let factory = circular_factory();

    let alphas: Vec<Arc<Alpha>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let factory = &factory;
                scope.spawn(move || {
                    if i % 2 == 0 {
                        factory.get_bean_of::<Alpha>("alpha").unwrap()
                    } else {
                        let beta = factory.get_bean_of::<Beta>("beta").unwrap();
                        let injected = beta.alpha.lock().clone();
                        injected.unwrap()
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let alpha = factory.get_bean_of::<Alpha>("alpha").unwrap();
    let beta = factory.get_bean_of::<Beta>("beta").unwrap();
    assert!(alphas.iter().all(|a| Arc::ptr_eq(a, &alpha)));
    assert!(Arc::ptr_eq(&alpha.beta.lock().clone().unwrap(), &beta));
    assert_eq!(factory.get_singleton_count(), 2);
}
