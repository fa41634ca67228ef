//! 后置处理器的调用与注册
//!
//! - BeanFactoryPostProcessor：先执行 BeanDefinitionRegistryPostProcessor，再执行普通处理器
//! - BeanPostProcessor：从定义中找出所有处理器 Bean，实例化后按 `order()` 注册到工厂

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use arbor_beans::{
    BeanFactory, BeanFactoryPostProcessor, BeanObject, BeanPostProcessor,
    BeanRole, ConfigurableBeanFactory, DefaultListableBeanFactory, ListableBeanFactory,
};
use arbor_core::{ContainerError, ContainerResult};

/// 调用所有 BeanFactoryPostProcessor
///
/// `manual` 是直接添加到上下文的处理器，先于定义中声明的处理器执行。
/// 定义中声明的注册处理器可能继续注册新的处理器定义，所以循环查找直到没有新的为止。
pub fn invoke_bean_factory_post_processors(
    factory: &DefaultListableBeanFactory,
    manual: &[Arc<dyn BeanFactoryPostProcessor>],
) -> ContainerResult<()> {
    let mut processed: HashSet<String> = HashSet::new();
    let mut registry_processors: Vec<Arc<dyn BeanFactoryPostProcessor>> = Vec::new();
    let mut regular_processors: Vec<Arc<dyn BeanFactoryPostProcessor>> = Vec::new();

    let mut manual: Vec<Arc<dyn BeanFactoryPostProcessor>> = manual.to_vec();
    manual.sort_by_key(|p| p.order());
    for processor in manual {
        match processor.as_registry_post_processor() {
            Some(registry_processor) => {
                tracing::debug!(
                    "Invoking BeanDefinitionRegistryPostProcessor '{}'",
                    processor.name()
                );
                registry_processor.post_process_bean_definition_registry(factory)?;
                registry_processors.push(processor);
            }
            None => regular_processors.push(processor),
        }
    }

    // 定义中声明的处理器
    let mut bean_regular: Vec<Arc<dyn BeanFactoryPostProcessor>> = Vec::new();
    loop {
        let names: Vec<String> = factory_post_processor_names(factory)?
            .into_iter()
            .filter(|name| !processed.contains(name))
            .collect();
        if names.is_empty() {
            break;
        }

        let mut current_registry = Vec::new();
        for name in names {
            let processor = get_factory_post_processor(factory, &name)?;
            processed.insert(name);
            if processor.as_registry_post_processor().is_some() {
                current_registry.push(processor);
            } else {
                bean_regular.push(processor);
            }
        }

        current_registry.sort_by_key(|p| p.order());
        for processor in current_registry {
            if let Some(registry_processor) = processor.as_registry_post_processor() {
                tracing::debug!(
                    "Invoking BeanDefinitionRegistryPostProcessor '{}'",
                    processor.name()
                );
                registry_processor.post_process_bean_definition_registry(factory)?;
            }
            registry_processors.push(processor);
        }
    }

    bean_regular.sort_by_key(|p| p.order());
    regular_processors.extend(bean_regular);

    for processor in registry_processors.iter().chain(regular_processors.iter()) {
        tracing::debug!("Invoking BeanFactoryPostProcessor '{}'", processor.name());
        processor.post_process_bean_factory(factory)?;
    }

    tracing::info!(
        "Invoked {} BeanFactoryPostProcessor(s)",
        registry_processors.len() + regular_processors.len()
    );
    Ok(())
}

fn factory_post_processor_names(factory: &DefaultListableBeanFactory) -> ContainerResult<Vec<String>> {
    let mut names = Vec::new();
    for name in factory.get_bean_definition_names() {
        let mbd = factory.get_merged_bean_definition(&name)?;
        if mbd.is_abstract {
            continue;
        }
        if factory.capabilities_of(&name)?.bean_factory_post_processor.is_some() {
            names.push(name);
        }
    }
    Ok(names)
}

fn get_factory_post_processor(
    factory: &DefaultListableBeanFactory,
    name: &str,
) -> ContainerResult<Arc<dyn BeanFactoryPostProcessor>> {
    let cast = factory
        .capabilities_of(name)?
        .bean_factory_post_processor
        .ok_or_else(|| ContainerError::NoSuchBeanDefinition(name.to_string()))?;
    let bean = factory.get_bean(name)?;
    cast(&bean).ok_or_else(|| ContainerError::TypeMismatch {
        bean: name.to_string(),
        expected: "BeanFactoryPostProcessor".to_string(),
        found: "instance of another type".to_string(),
    })
}

/// 找出定义中声明的 BeanPostProcessor，实例化并注册到工厂
pub fn register_bean_post_processors(factory: &Arc<DefaultListableBeanFactory>) -> ContainerResult<()> {
    let mut names = Vec::new();
    for name in factory.get_bean_definition_names() {
        let mbd = factory.get_merged_bean_definition(&name)?;
        if mbd.is_abstract {
            continue;
        }
        if factory.capabilities_of(&name)?.bean_post_processor.is_some() {
            names.push(name);
        }
    }

    // 处理器实例化期间创建的普通 Bean 不会经过全部处理器
    let target_count = factory.get_bean_post_processor_count() + 1 + names.len();
    factory.add_bean_post_processor(Arc::new(BeanPostProcessorChecker {
        factory: Arc::downgrade(factory),
        target_count,
    }));

    let mut processors: Vec<Arc<dyn BeanPostProcessor>> = Vec::with_capacity(names.len());
    for name in &names {
        let cast = factory
            .capabilities_of(name)?
            .bean_post_processor
            .ok_or_else(|| ContainerError::NoSuchBeanDefinition(name.clone()))?;
        let bean = factory.get_bean(name)?;
        let processor = cast(&bean).ok_or_else(|| ContainerError::TypeMismatch {
            bean: name.clone(),
            expected: "BeanPostProcessor".to_string(),
            found: "instance of another type".to_string(),
        })?;
        processors.push(processor);
    }

    processors.sort_by_key(|p| p.order());
    for processor in processors {
        factory.add_bean_post_processor(processor);
    }

    tracing::info!("Registered {} BeanPostProcessor(s) from bean definitions", names.len());
    Ok(())
}

/// 记录在处理器注册期间被创建、因而没有经过全部处理器的 Bean
struct BeanPostProcessorChecker {
    factory: Weak<DefaultListableBeanFactory>,
    target_count: usize,
}

impl BeanPostProcessor for BeanPostProcessorChecker {
    fn post_process_after_initialization(&self, bean: BeanObject, bean_name: &str) -> ContainerResult<BeanObject> {
        let factory = match self.factory.upgrade() {
            Some(factory) => factory,
            None => return Ok(bean),
        };
        let infrastructure = factory
            .get_merged_bean_definition(bean_name)
            .map_or(false, |mbd| mbd.role == BeanRole::Infrastructure);
        let is_processor = factory
            .capabilities_of(bean_name)
            .map_or(false, |c| c.bean_post_processor.is_some());
        if !infrastructure
            && !is_processor
            && factory.get_bean_post_processor_count() < self.target_count
        {
            tracing::info!(
                "Bean '{}' is not eligible for getting processed by all BeanPostProcessors (for example: not eligible for auto-proxying)",
                bean_name
            );
        }
        Ok(bean)
    }

    fn name(&self) -> &str {
        "BeanPostProcessorChecker"
    }
}
