use std::sync::Arc;

use parking_lot::Mutex;

use arbor_context::prelude::*;

struct AuditLog {
    entries: Mutex<Vec<String>>,
}

impl Component for AuditLog {
    fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<AuditLog>("AuditLog")
            .default_constructor(|| AuditLog {
                entries: Mutex::new(Vec::new()),
            })
            .build()
    }

    fn aliases() -> Vec<String> {
        vec!["audit".to_string()]
    }
}

arbor_context::component!(AuditLog);

struct AccountService {
    audit: Arc<AuditLog>,
    name: Mutex<Option<String>>,
}

impl Component for AccountService {
    fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<AccountService>("AccountService")
            .constructor(vec![ParamSpec::of::<AuditLog>()], |args| {
                Ok(AccountService {
                    audit: args.get::<AuditLog>(0)?,
                    name: Mutex::new(None),
                })
            })
            .bean_name_aware(|s: &AccountService, name| {
                *s.name.lock() = Some(name.to_string());
            })
            .initializing_bean(|s: &AccountService| {
                s.audit.entries.lock().push("accounts ready".to_string());
                Ok(())
            })
            .build()
    }

    fn depends_on() -> Vec<String> {
        vec!["audit".to_string()]
    }
}

arbor_context::component!(AccountService);

struct ReportJob;

impl Component for ReportJob {
    fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<ReportJob>("ReportJob")
            .default_constructor(|| ReportJob)
            .build()
    }

    fn bean_name() -> String {
        "nightlyReport".to_string()
    }

    fn scope() -> Scope {
        Scope::Prototype
    }
}

arbor_context::component!(ReportJob);

#[test]
fn submitted_components_are_registered_on_refresh() {
    let context = ApplicationContext::builder().component_scan(true).build().unwrap();
    context.refresh().unwrap();

    assert!(context.contains_bean_definition("auditLog"));
    assert!(context.contains_bean_definition("accountService"));
    assert!(context.contains_bean("audit"));

    let service = context.get_bean_of::<AccountService>("accountService").unwrap();
    assert_eq!(service.name.lock().as_deref(), Some("accountService"));
    assert!(Arc::ptr_eq(
        &service.audit,
        &context.get_bean_of::<AuditLog>("audit").unwrap()
    ));
    assert_eq!(*service.audit.entries.lock(), vec!["accounts ready".to_string()]);

    let first = context.get_bean_of::<ReportJob>("nightlyReport").unwrap();
    let second = context.get_bean_of::<ReportJob>("nightlyReport").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn scanning_twice_is_rejected_without_overriding() {
    let context = ApplicationContext::builder()
        .factory_config(FactoryConfig {
            allow_bean_definition_overriding: false,
            ..FactoryConfig::default()
        })
        .build()
        .unwrap();
    context.scan_components().unwrap();
    let err = context.scan_components().unwrap_err();
    assert!(matches!(err, ContainerError::BeanDefinitionOverride { .. }));
}
