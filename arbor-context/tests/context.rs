use std::sync::Arc;

use parking_lot::Mutex;

use arbor_beans::{
    BeanClass, BeanDefinition, BeanFactory, BeanFactoryExt, BeanFactoryPostProcessor, BeanObject,
    BeanPostProcessor, ClassRegistry, DefaultListableBeanFactory, ParamSpec,
};
use arbor_context::{ApplicationContext, PropertyPlaceholderConfigurer};
use arbor_core::{ContainerError, ContainerResult, MapPropertySource};

type Log = Arc<Mutex<Vec<String>>>;

struct Resource {
    name: String,
    log: Log,
}

fn resource_class(log: Log) -> Arc<BeanClass> {
    let ctor_log = log.clone();
    BeanClass::builder::<Resource>("Resource")
        .constructor(vec![ParamSpec::of::<String>().named("name")], move |args| {
            Ok(Resource {
                name: args.value::<String>(0)?,
                log: ctor_log.clone(),
            })
        })
        .disposable_bean(|r: &Resource| {
            r.log.lock().push(format!("destroy:{}", r.name));
            Ok(())
        })
        .build()
}

fn resource(log: &Log, name: &str) -> BeanDefinition {
    BeanDefinition::of_class(resource_class(log.clone())).with_constructor_arg(name)
}

#[test]
fn close_runs_hooks_then_destroys_in_dependency_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let context = ApplicationContext::new();
    context.register_bean_definition("database", resource(&log, "database")).unwrap();
    context
        .register_bean_definition(
            "cache",
            resource(&log, "cache").with_depends_on(["database"]),
        )
        .unwrap();

    let hook_log = log.clone();
    context.register_shutdown_hook(move || {
        hook_log.lock().push("hook".to_string());
        Ok(())
    });
    context.register_shutdown_hook(|| Err(ContainerError::IllegalState("hook failed".to_string())));

    context.refresh().unwrap();
    assert!(context.is_active());
    assert_eq!(context.get_bean_of::<Resource>("cache").unwrap().name, "cache");

    context.close();
    context.close();

    assert_eq!(
        *log.lock(),
        vec!["hook", "destroy:cache", "destroy:database"]
    );
    assert!(context.is_closed());
    assert!(!context.is_active());

    let err = context.get_bean("database").unwrap_err();
    assert!(err.to_string().contains("has been closed already"));
    assert!(context.refresh().is_err());
}

#[test]
fn failed_refresh_destroys_created_singletons() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let context = ApplicationContext::new();
    context.register_bean_definition("first", resource(&log, "first")).unwrap();
    context
        .register_bean_definition(
            "broken",
            BeanDefinition::from_supplier(|| -> ContainerResult<u32> {
                Err(ContainerError::IllegalState("boom".to_string()))
            }),
        )
        .unwrap();

    let err = context.refresh().unwrap_err();
    assert!(err.to_string().contains("boom"));
    assert_eq!(*log.lock(), vec!["destroy:first"]);
    assert!(!context.is_active());
    assert!(!context.bean_factory().contains_singleton("first"));
}

struct Upper;

impl BeanPostProcessor for Upper {
    fn post_process_after_initialization(&self, bean: BeanObject, _name: &str) -> ContainerResult<BeanObject> {
        match bean.downcast_ref::<String>() {
            Some(text) => Ok(Arc::new(text.to_uppercase())),
            None => Ok(bean),
        }
    }
}

struct Renamer;

impl BeanFactoryPostProcessor for Renamer {
    fn post_process_bean_factory(&self, factory: &DefaultListableBeanFactory) -> ContainerResult<()> {
        factory.modify_bean_definition("greeting", |definition| definition.lazy = true)
    }
}

#[test]
fn declared_post_processors_take_part_in_refresh() {
    let context = ApplicationContext::new();
    context
        .register_bean_definition(
            "upper",
            BeanDefinition::from_supplier(|| Ok(Upper)).with_bean_post_processor_role::<Upper>(),
        )
        .unwrap();
    context
        .register_bean_definition(
            "renamer",
            BeanDefinition::from_supplier(|| Ok(Renamer)).with_factory_post_processor_role::<Renamer>(),
        )
        .unwrap();
    context.register_bean("greeting", || Ok("hello".to_string())).unwrap();

    context.refresh().unwrap();

    // 延迟初始化，刷新后还没有创建
    assert!(!context.bean_factory().contains_singleton("greeting"));
    assert_eq!(*context.get_bean_of::<String>("greeting").unwrap(), "HELLO");
}

struct Registry {
    ready: Mutex<bool>,
}

#[test]
fn smart_singletons_notified_after_preinstantiation() {
    let context = ApplicationContext::new();
    context
        .register_bean_definition(
            "registry",
            BeanDefinition::of_class(
                BeanClass::builder::<Registry>("Registry")
                    .default_constructor(|| Registry { ready: Mutex::new(false) })
                    .after_singletons_instantiated(|r: &Registry| {
                        *r.ready.lock() = true;
                        Ok(())
                    })
                    .build(),
            ),
        )
        .unwrap();

    context.refresh().unwrap();
    assert!(*context.get_bean_by_type::<Registry>().unwrap().ready.lock());
}

struct Endpoint {
    url: Mutex<String>,
    timeout: Mutex<i64>,
}

fn endpoint_classes() -> ClassRegistry {
    ClassRegistry::new()
        .with(
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
                .build(),
        )
        .with(PropertyPlaceholderConfigurer::bean_class())
}

#[test]
fn placeholder_configurer_declared_in_definitions() {
    let context = ApplicationContext::builder()
        .add_property_source(Box::new(
            MapPropertySource::new("test")
                .with("endpoint.host", "orders.internal")
                .with("endpoint.name", "orders"),
        ))
        .build()
        .unwrap();

    let count = context
        .load_bean_definitions_from_str(
            r#"
            [[bean]]
            id = "placeholders"
            class = "PropertyPlaceholderConfigurer"

            [[bean]]
            id = "endpoint"
            class = "Endpoint"

            [[bean.property]]
            name = "url"
            value = "https://${endpoint.host}/api"

            [[bean.property]]
            name = "timeout"
            value = "${endpoint.timeout:30}"

            [[alias]]
            name = "endpoint"
            alias = "${endpoint.name}Endpoint"
            "#,
            &endpoint_classes(),
        )
        .unwrap();
    assert_eq!(count, 2);

    context.refresh().unwrap();

    let endpoint = context.get_bean_of::<Endpoint>("ordersEndpoint").unwrap();
    assert_eq!(*endpoint.url.lock(), "https://orders.internal/api");
    assert_eq!(*endpoint.timeout.lock(), 30);
}

#[test]
fn unresolvable_placeholder_fails_refresh() {
    let context = ApplicationContext::new();
    context.add_bean_factory_post_processor(Arc::new(PropertyPlaceholderConfigurer::new(
        context.environment().clone(),
    )));
    context
        .load_bean_definitions_from_str(
            r#"
            [[bean]]
            id = "endpoint"
            class = "Endpoint"

            [[bean.property]]
            name = "url"
            value = "${missing.url}"
            "#,
            &endpoint_classes(),
        )
        .unwrap();

    match context.refresh().unwrap_err() {
        ContainerError::BeanDefinitionStore { bean, message } => {
            assert_eq!(bean, "endpoint");
            assert!(message.contains("missing.url"));
        }
        other => panic!("unexpected error: {}", other),
    }
}
