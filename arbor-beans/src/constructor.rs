//! 构造函数 / 工厂方法解析
//!
//! 在候选构造函数（或同名工厂方法）中选出与定义参数最匹配的一个：
//! 1. 解析定义中的构造参数值
//! 2. 候选按参数个数从多到少排序，逐个尝试构建参数数组
//! 3. 用类型差异权重（宽松模式）或可赋值权重（严格模式）打分，取最小
//! 4. 严格模式下出现同分候选视为歧义
//! 5. 结果缓存到合并后的定义上，原型再次创建时直接复用

use std::collections::HashSet;
use std::sync::Arc;

use arbor_core::{ContainerError, ContainerResult};

use crate::class::{instance_type_id, Args, BeanClass, Executable, ParamSpec};
use crate::definition::{AutowireMode, BeanDefinition, PreparedArgument};
use crate::factory::{
    AutowireCapableBeanFactory, BeanFactory, ConfigurableBeanFactory, DefaultListableBeanFactory,
    DependencyDescriptor,
};
use crate::value::{describe, ConstructorArgumentValues, HolderKey, TypeConverter, Value};
use crate::value_resolver::BeanDefinitionValueResolver;
use crate::BeanObject;

/// 构建好的参数数组
struct ArgumentsHolder {
    raw_arguments: Vec<Option<BeanObject>>,
    arguments: Vec<Option<BeanObject>>,
    prepared_arguments: Vec<PreparedArgument>,
    resolve_necessary: bool,
}

impl ArgumentsHolder {
    fn with_capacity(size: usize) -> Self {
        Self {
            raw_arguments: Vec::with_capacity(size),
            arguments: Vec::with_capacity(size),
            prepared_arguments: Vec::with_capacity(size),
            resolve_necessary: false,
        }
    }

    fn explicit(args: &[Option<BeanObject>]) -> Self {
        Self {
            raw_arguments: args.to_vec(),
            arguments: args.to_vec(),
            prepared_arguments: args
                .iter()
                .cloned()
                .map(PreparedArgument::Resolved)
                .collect(),
            resolve_necessary: false,
        }
    }

    /// 宽松模式权重：转换后参数与原始参数的类型差异取较小者，原始参数优先
    fn type_difference_weight(&self, params: &[ParamSpec]) -> i32 {
        let converted = type_difference_weight(params, &self.arguments);
        let raw = type_difference_weight(params, &self.raw_arguments) - 1024;
        raw.min(converted)
    }

    /// 严格模式权重：只区分能否直接赋值
    fn assignability_weight(&self, params: &[ParamSpec]) -> i32 {
        let assignable = |args: &[Option<BeanObject>]| {
            params
                .iter()
                .zip(args)
                .all(|(p, a)| a.as_ref().map_or(true, |v| p.is_assignable(v)))
        };
        if !assignable(&self.arguments) {
            return i32::MAX;
        }
        if !assignable(&self.raw_arguments) {
            return i32::MAX - 512;
        }
        i32::MAX - 1024
    }

    fn weight(&self, params: &[ParamSpec], lenient: bool) -> i32 {
        if lenient {
            self.type_difference_weight(params)
        } else {
            self.assignability_weight(params)
        }
    }

    fn store_cache(&self, definition: &BeanDefinition, executable: &Executable) {
        let mut cache = definition.resolution.lock();
        cache.executable = Some(executable.clone());
        cache.arguments_resolved = true;
        if self.resolve_necessary {
            cache.prepared_arguments = Some(self.prepared_arguments.clone());
        } else {
            cache.resolved_arguments = Some(self.arguments.clone());
        }
    }
}

/// 参数类型差异：完全一致为 0，任意类型参数为 2，不可赋值为 `i32::MAX`
fn type_difference_weight(params: &[ParamSpec], args: &[Option<BeanObject>]) -> i32 {
    let mut result = 0i32;
    for (param, arg) in params.iter().zip(args) {
        if let Some(value) = arg {
            if instance_type_id(value) == param.type_id {
                continue;
            }
            if !param.accepts_any {
                return i32::MAX;
            }
            result += 2;
        }
    }
    result
}

fn unsatisfied(
    bean_name: &str,
    index: usize,
    param: &ParamSpec,
    message: impl Into<String>,
    source: Option<ContainerError>,
) -> ContainerError {
    ContainerError::UnsatisfiedDependency {
        bean: bean_name.to_string(),
        index,
        type_name: param.type_name.to_string(),
        message: message.into(),
        source: source.map(Box::new),
    }
}

/// 缓存的执行体与参数
fn cached_resolution(
    definition: &BeanDefinition,
) -> (Option<Executable>, Option<Vec<Option<BeanObject>>>, Option<Vec<PreparedArgument>>) {
    let cache = definition.resolution.lock();
    match &cache.executable {
        Some(executable) if cache.arguments_resolved => (
            Some(executable.clone()),
            cache.resolved_arguments.clone(),
            if cache.resolved_arguments.is_none() {
                cache.prepared_arguments.clone()
            } else {
                None
            },
        ),
        other => (other.clone(), None, None),
    }
}

pub(crate) struct ConstructorResolver<'a> {
    factory: &'a DefaultListableBeanFactory,
    converter: TypeConverter,
}

impl<'a> ConstructorResolver<'a> {
    pub(crate) fn new(factory: &'a DefaultListableBeanFactory) -> Self {
        Self {
            factory,
            converter: factory.type_converter(),
        }
    }

    /// 通过构造函数自动装配创建实例
    ///
    /// `chosen` 为空时使用类型上登记的全部构造函数
    pub(crate) fn autowire_constructor(
        &self,
        bean_name: &str,
        mbd: &BeanDefinition,
        class: &BeanClass,
        chosen: Option<Vec<Executable>>,
        explicit_args: Option<&[Option<BeanObject>]>,
    ) -> ContainerResult<BeanObject> {
        let mut constructor_to_use: Option<Executable> = None;
        let mut args_to_use: Option<Vec<Option<BeanObject>>> = None;

        match explicit_args {
            Some(args) => args_to_use = Some(args.to_vec()),
            None => {
                let (cached, resolved, prepared) = cached_resolution(mbd);
                if let Some(executable) = cached.filter(|e| e.is_constructor()) {
                    if let Some(resolved) = resolved {
                        args_to_use = Some(resolved);
                        constructor_to_use = Some(executable);
                    } else if let Some(prepared) = prepared {
                        args_to_use =
                            Some(self.resolve_prepared_arguments(bean_name, mbd, &executable, &prepared)?);
                        constructor_to_use = Some(executable);
                    }
                }
            }
        }

        if constructor_to_use.is_none() {
            let autowiring = chosen.is_some() || mbd.autowire_mode == AutowireMode::Constructor;
            let mut resolved_values = None;
            let min_nr_of_args = match explicit_args {
                Some(args) => args.len(),
                None => {
                    let mut resolved = ConstructorArgumentValues::new();
                    let min = self.resolve_constructor_arguments(
                        bean_name,
                        mbd,
                        &mbd.constructor_args,
                        &mut resolved,
                    )?;
                    resolved_values = Some(resolved);
                    min
                }
            };

            let mut candidates = chosen.unwrap_or_else(|| class.constructors().to_vec());
            // 参数多的优先；sort_by 是稳定排序，同参数个数保持登记顺序
            candidates.sort_by(|a, b| b.param_count().cmp(&a.param_count()));

            let lenient = mbd.lenient_constructor_resolution;
            let mut min_weight = i32::MAX;
            let mut holder_to_use: Option<ArgumentsHolder> = None;
            let mut ambiguous: Vec<Executable> = Vec::new();
            let mut causes: Vec<ContainerError> = Vec::new();

            for candidate in &candidates {
                let param_count = candidate.param_count();
                if let (Some(_), Some(args)) = (&constructor_to_use, &args_to_use) {
                    if args.len() > param_count {
                        // 已经找到参数更多的可用构造函数
                        break;
                    }
                }
                if param_count < min_nr_of_args {
                    continue;
                }

                let holder = match (&resolved_values, explicit_args) {
                    (Some(resolved), _) => match self.create_argument_array(
                        bean_name,
                        mbd,
                        resolved,
                        candidate,
                        autowiring,
                    ) {
                        Ok(holder) => holder,
                        Err(e) => {
                            tracing::trace!(
                                "Ignoring constructor [{}] of bean '{}': {}",
                                candidate,
                                bean_name,
                                e
                            );
                            causes.push(e);
                            continue;
                        }
                    },
                    (None, Some(args)) => {
                        if param_count != args.len() {
                            continue;
                        }
                        ArgumentsHolder::explicit(args)
                    }
                    (None, None) => continue,
                };

                let weight = holder.weight(&candidate.params, lenient);
                if weight < min_weight {
                    constructor_to_use = Some(candidate.clone());
                    args_to_use = Some(holder.arguments.clone());
                    holder_to_use = Some(holder);
                    min_weight = weight;
                    ambiguous.clear();
                } else if weight == min_weight {
                    if let Some(current) = &constructor_to_use {
                        if ambiguous.is_empty() {
                            ambiguous.push(current.clone());
                        }
                        ambiguous.push(candidate.clone());
                    }
                }
            }

            let constructor = match &constructor_to_use {
                Some(constructor) => constructor.clone(),
                None => {
                    if let Some(last) = causes.pop() {
                        for cause in &causes {
                            self.factory.on_suppressed_error(cause);
                        }
                        return Err(last);
                    }
                    return Err(ContainerError::creation(
                        bean_name,
                        "Could not resolve matching constructor (hint: specify index/type/name arguments for simple parameters to avoid type ambiguities)",
                    ));
                }
            };

            if !ambiguous.is_empty() && !lenient {
                return Err(ContainerError::creation(
                    bean_name,
                    format!(
                        "Ambiguous constructor matches found in bean '{}' (hint: specify index/type/name arguments for simple parameters to avoid type ambiguities): {:?}",
                        bean_name, ambiguous
                    ),
                ));
            }

            if explicit_args.is_none() {
                if let Some(holder) = &holder_to_use {
                    holder.store_cache(mbd, &constructor);
                }
            }
        }

        let constructor = constructor_to_use.ok_or_else(|| {
            ContainerError::creation(bean_name, "Could not resolve matching constructor")
        })?;
        let args = Args::new(args_to_use.unwrap_or_default());
        tracing::trace!("Instantiating bean '{}' via {}", bean_name, constructor);
        constructor.invoke(None, &args).map_err(|e| {
            ContainerError::creation_caused_by(bean_name, "Bean instantiation via constructor failed", e)
        })
    }

    /// 预先确定工厂方法的返回类型（供类型预测使用）
    pub(crate) fn resolve_factory_method_if_possible(&self, mbd: &BeanDefinition) {
        let (factory_class, is_static) = match &mbd.factory_bean_name {
            Some(factory_bean_name) => (self.factory.class_of_bean(factory_bean_name), false),
            None => (mbd.bean_class.clone(), true),
        };
        let (factory_class, method_name) = match (factory_class, &mbd.factory_method_name) {
            (Some(class), Some(name)) => (class, name),
            _ => return,
        };

        // 重载的候选只要返回类型一致，就足以预测类型
        let mut unique: Option<Executable> = None;
        for candidate in factory_class.factory_methods_named(method_name, is_static) {
            match &unique {
                None => unique = Some(candidate),
                Some(existing) if existing.return_type.type_id != candidate.return_type.type_id => {
                    unique = None;
                    break;
                }
                Some(_) => {}
            }
        }
        mbd.resolution.lock().factory_method_to_introspect = unique;
    }

    /// 通过静态工厂方法或实例工厂方法创建实例
    pub(crate) fn instantiate_using_factory_method(
        &self,
        bean_name: &str,
        mbd: &BeanDefinition,
        explicit_args: Option<&[Option<BeanObject>]>,
    ) -> ContainerResult<BeanObject> {
        let (factory_bean, factory_class, is_static): (Option<BeanObject>, Arc<BeanClass>, bool) =
            match &mbd.factory_bean_name {
                Some(factory_bean_name) => {
                    if factory_bean_name == bean_name {
                        return Err(ContainerError::BeanDefinitionStore {
                            bean: bean_name.to_string(),
                            message: "factory-bean reference points back to the same bean definition"
                                .to_string(),
                        });
                    }
                    let factory_bean = self.factory.get_bean(factory_bean_name)?;
                    if mbd.is_singleton() && self.factory.contains_singleton(bean_name) {
                        return Err(ContainerError::IllegalState(
                            "About-to-be-created singleton instance implicitly appeared through the creation of the factory bean that its bean definition points to"
                                .to_string(),
                        ));
                    }
                    let class = self
                        .factory
                        .class_for_instance(&factory_bean)
                        .or_else(|| self.factory.class_of_bean(factory_bean_name))
                        .ok_or_else(|| {
                            ContainerError::creation(
                                bean_name,
                                format!(
                                    "factory-bean '{}' has no class metadata to look up factory methods on",
                                    factory_bean_name
                                ),
                            )
                        })?;
                    (Some(factory_bean), class, false)
                }
                None => {
                    let class = mbd.bean_class.clone().ok_or_else(|| {
                        ContainerError::BeanDefinitionStore {
                            bean: bean_name.to_string(),
                            message: "bean definition declares neither a bean class nor a factory-bean reference"
                                .to_string(),
                        }
                    })?;
                    (None, class, true)
                }
            };
        let method_name = mbd.factory_method_name.clone().unwrap_or_default();

        let mut factory_method_to_use: Option<Executable> = None;
        let mut args_to_use: Option<Vec<Option<BeanObject>>> = None;

        match explicit_args {
            Some(args) => args_to_use = Some(args.to_vec()),
            None => {
                let (cached, resolved, prepared) = cached_resolution(mbd);
                if let Some(executable) = cached.filter(|e| !e.is_constructor()) {
                    if let Some(resolved) = resolved {
                        args_to_use = Some(resolved);
                        factory_method_to_use = Some(executable);
                    } else if let Some(prepared) = prepared {
                        args_to_use =
                            Some(self.resolve_prepared_arguments(bean_name, mbd, &executable, &prepared)?);
                        factory_method_to_use = Some(executable);
                    }
                }
            }
        }

        if factory_method_to_use.is_none() || args_to_use.is_none() {
            let mut candidates = factory_class.factory_methods_named(&method_name, is_static);
            candidates.sort_by(|a, b| b.param_count().cmp(&a.param_count()));

            let autowiring = mbd.autowire_mode == AutowireMode::Constructor;
            let lenient = mbd.lenient_constructor_resolution;
            let mut resolved_values = None;
            let min_nr_of_args = match explicit_args {
                Some(args) => args.len(),
                None => {
                    let mut resolved = ConstructorArgumentValues::new();
                    let min = self.resolve_constructor_arguments(
                        bean_name,
                        mbd,
                        &mbd.constructor_args,
                        &mut resolved,
                    )?;
                    resolved_values = Some(resolved);
                    min
                }
            };

            factory_method_to_use = None;
            let mut min_weight = i32::MAX;
            let mut holder_to_use: Option<ArgumentsHolder> = None;
            let mut ambiguous: Vec<Executable> = Vec::new();
            let mut causes: Vec<ContainerError> = Vec::new();
            let last_index = candidates.len().saturating_sub(1);

            for (i, candidate) in candidates.iter().enumerate() {
                if candidate.param_count() < min_nr_of_args {
                    continue;
                }
                let holder = match (&resolved_values, explicit_args) {
                    (Some(resolved), _) => match self.create_argument_array(
                        bean_name,
                        mbd,
                        resolved,
                        candidate,
                        autowiring,
                    ) {
                        Ok(holder) => holder,
                        Err(e) => {
                            tracing::trace!(
                                "Ignoring factory method [{}] of bean '{}': {}",
                                candidate,
                                bean_name,
                                e
                            );
                            if i == last_index && holder_to_use.is_none() {
                                for cause in &causes {
                                    self.factory.on_suppressed_error(cause);
                                }
                                return Err(e);
                            }
                            causes.push(e);
                            continue;
                        }
                    },
                    (None, Some(args)) => {
                        if candidate.param_count() != args.len() {
                            continue;
                        }
                        ArgumentsHolder::explicit(args)
                    }
                    (None, None) => continue,
                };

                let weight = holder.weight(&candidate.params, lenient);
                if weight < min_weight {
                    factory_method_to_use = Some(candidate.clone());
                    args_to_use = Some(holder.arguments.clone());
                    holder_to_use = Some(holder);
                    min_weight = weight;
                    ambiguous.clear();
                } else if let Some(current) = &factory_method_to_use {
                    // 只有参数个数相同、参数类型不同的同分候选才算歧义
                    if weight == min_weight
                        && !lenient
                        && candidate.param_count() == current.param_count()
                        && !candidate.same_param_types(current)
                    {
                        if ambiguous.is_empty() {
                            ambiguous.push(current.clone());
                        }
                        ambiguous.push(candidate.clone());
                    }
                }
            }

            let factory_method = match &factory_method_to_use {
                Some(method) => method.clone(),
                None => {
                    let arg_types: Vec<String> = match (explicit_args, &resolved_values) {
                        (Some(args), _) => args
                            .iter()
                            .map(|a| a.as_ref().map_or("null".to_string(), describe_type))
                            .collect(),
                        (None, Some(resolved)) => resolved
                            .indexed()
                            .values()
                            .chain(resolved.generic().iter())
                            .map(|holder| match (&holder.type_name, &holder.value) {
                                (Some(type_name), _) => type_name.clone(),
                                (None, Value::Object(obj)) => describe_type(obj),
                                (None, _) => "null".to_string(),
                            })
                            .collect(),
                        (None, None) => Vec::new(),
                    };
                    return Err(ContainerError::creation(
                        bean_name,
                        format!(
                            "No matching factory method found: {}factory method '{}({})'. Check that a method with the specified name {}exists and that it is {}.",
                            mbd.factory_bean_name
                                .as_ref()
                                .map(|f| format!("factory bean '{}'; ", f))
                                .unwrap_or_default(),
                            method_name,
                            arg_types.join(","),
                            if min_nr_of_args > 0 { "and arguments " } else { "" },
                            if is_static { "static" } else { "non-static" },
                        ),
                    ));
                }
            };

            if factory_method.returns_unit() {
                return Err(ContainerError::creation(
                    bean_name,
                    format!(
                        "Invalid factory method '{}': needs to have a non-void return type!",
                        method_name
                    ),
                ));
            }
            if !ambiguous.is_empty() {
                return Err(ContainerError::creation(
                    bean_name,
                    format!(
                        "Ambiguous factory method matches found in bean '{}' (hint: specify index/type/name arguments for simple parameters to avoid type ambiguities): {:?}",
                        bean_name, ambiguous
                    ),
                ));
            }
            if explicit_args.is_none() {
                if let Some(holder) = &holder_to_use {
                    holder.store_cache(mbd, &factory_method);
                }
            }
        }

        let factory_method = factory_method_to_use.ok_or_else(|| {
            ContainerError::creation(bean_name, "No matching factory method found")
        })?;
        let args = Args::new(args_to_use.unwrap_or_default());
        tracing::trace!("Instantiating bean '{}' via {}", bean_name, factory_method);
        factory_method
            .invoke(factory_bean.as_ref(), &args)
            .map_err(|e| {
                ContainerError::creation_caused_by(
                    bean_name,
                    "Bean instantiation via factory method failed",
                    e,
                )
            })
    }

    /// 解析定义中的构造参数值，返回最少需要的参数个数
    fn resolve_constructor_arguments(
        &self,
        bean_name: &str,
        mbd: &BeanDefinition,
        cargs: &ConstructorArgumentValues,
        resolved: &mut ConstructorArgumentValues,
    ) -> ContainerResult<usize> {
        let value_resolver = BeanDefinitionValueResolver::new(self.factory, bean_name, mbd);
        let mut min_nr_of_args = cargs.argument_count();

        for (&index, holder) in cargs.indexed() {
            if index + 1 > min_nr_of_args {
                min_nr_of_args = index + 1;
            }
            if holder.converted.is_some() {
                resolved.add_indexed(index, holder.clone());
            } else {
                let value = value_resolver.resolve_value_if_necessary("constructor argument", &holder.value)?;
                resolved.add_indexed(index, holder.resolved(to_value(value)));
            }
        }

        for holder in cargs.generic() {
            if holder.converted.is_some() {
                resolved.add_generic(holder.clone());
            } else {
                let value = value_resolver.resolve_value_if_necessary("constructor argument", &holder.value)?;
                resolved.add_generic(holder.resolved(to_value(value)));
            }
        }

        Ok(min_nr_of_args)
    }

    /// 为一个候选构建参数数组
    fn create_argument_array(
        &self,
        bean_name: &str,
        mbd: &BeanDefinition,
        resolved: &ConstructorArgumentValues,
        executable: &Executable,
        autowiring: bool,
    ) -> ContainerResult<ArgumentsHolder> {
        let method_type = executable.kind_label();
        let mut args = ArgumentsHolder::with_capacity(executable.param_count());
        let mut used: HashSet<HolderKey> = HashSet::new();
        let mut autowired_bean_names: Vec<String> = Vec::new();

        for (index, param) in executable.params.iter().enumerate() {
            let param_name = param.name.as_deref();
            let mut found = resolved
                .get_argument_value(index, Some(param), param_name, &used)
                .map(|(key, holder)| (key, holder.clone()));
            if found.is_none() && !autowiring {
                found = resolved
                    .get_generic_argument_value(None, None, &used)
                    .map(|(key, holder)| (key, holder.clone()));
            }

            match found {
                Some((key, holder)) => {
                    used.insert(key);
                    let original = match &holder.value {
                        Value::Object(obj) => Some(obj.clone()),
                        _ => None,
                    };
                    if let Some(converted) = holder.converted.clone() {
                        args.prepared_arguments
                            .push(PreparedArgument::Resolved(Some(converted.clone())));
                        args.arguments.push(Some(converted));
                    } else {
                        let converted = self
                            .converter
                            .convert_if_necessary(original.clone(), param)
                            .map_err(|e| {
                                unsatisfied(
                                    bean_name,
                                    index,
                                    param,
                                    format!(
                                        "Could not convert {} argument value of type [{}] to required type [{}]: {}",
                                        method_type,
                                        original.as_ref().map_or("null".to_string(), describe_type),
                                        param.type_name,
                                        e
                                    ),
                                    None,
                                )
                            })?;
                        match source_value(&mbd.constructor_args, key) {
                            Some(source) if needs_re_resolution(&source) => {
                                args.resolve_necessary = true;
                                args.prepared_arguments.push(PreparedArgument::Source(source));
                            }
                            _ => args
                                .prepared_arguments
                                .push(PreparedArgument::Resolved(converted.clone())),
                        }
                        args.arguments.push(converted);
                    }
                    args.raw_arguments.push(original);
                }
                None => {
                    if !autowiring {
                        return Err(unsatisfied(
                            bean_name,
                            index,
                            param,
                            format!(
                                "Ambiguous {} argument types - did you specify the correct bean references as {} arguments?",
                                method_type, method_type
                            ),
                            None,
                        ));
                    }
                    let descriptor = DependencyDescriptor::new(param.clone(), true);
                    let autowired = self
                        .factory
                        .resolve_dependency(&descriptor, Some(bean_name), Some(&mut autowired_bean_names))
                        .map_err(|e| unsatisfied(bean_name, index, param, e.to_string(), Some(e)))?;
                    args.raw_arguments.push(autowired.clone());
                    args.arguments.push(autowired);
                    args.prepared_arguments.push(PreparedArgument::Autowired);
                    args.resolve_necessary = true;
                }
            }
        }

        for autowired in &autowired_bean_names {
            self.factory.register_dependent_bean(autowired, bean_name);
            tracing::debug!(
                "Autowiring by type from bean name '{}' via {} to bean named '{}'",
                bean_name,
                method_type,
                autowired
            );
        }

        Ok(args)
    }

    /// 重新解析缓存的预备参数（自动装配参数、引用、字符串）
    fn resolve_prepared_arguments(
        &self,
        bean_name: &str,
        mbd: &BeanDefinition,
        executable: &Executable,
        prepared: &[PreparedArgument],
    ) -> ContainerResult<Vec<Option<BeanObject>>> {
        let value_resolver = BeanDefinitionValueResolver::new(self.factory, bean_name, mbd);
        let mut resolved = Vec::with_capacity(prepared.len());

        for (index, (argument, param)) in prepared.iter().zip(&executable.params).enumerate() {
            let value = match argument {
                PreparedArgument::Autowired => {
                    let descriptor = DependencyDescriptor::new(param.clone(), true);
                    self.factory.resolve_dependency(&descriptor, Some(bean_name), None)?
                }
                PreparedArgument::Source(source) => {
                    value_resolver.resolve_value_if_necessary("constructor argument", source)?
                }
                PreparedArgument::Resolved(value) => value.clone(),
            };
            let converted = self
                .converter
                .convert_if_necessary(value.clone(), param)
                .map_err(|e| {
                    unsatisfied(
                        bean_name,
                        index,
                        param,
                        format!(
                            "Could not convert {} argument value of type [{}] to required type [{}]: {}",
                            executable.kind_label(),
                            value.as_ref().map_or("null".to_string(), describe_type),
                            param.type_name,
                            e
                        ),
                        None,
                    )
                })?;
            resolved.push(converted);
        }
        Ok(resolved)
    }
}

fn to_value(resolved: Option<BeanObject>) -> Value {
    match resolved {
        Some(obj) => Value::Object(obj),
        None => Value::Null,
    }
}

/// 定义中对应位置的原始值
fn source_value(cargs: &ConstructorArgumentValues, key: HolderKey) -> Option<Value> {
    match key {
        HolderKey::Indexed(index) => cargs.indexed().get(&index).map(|h| h.value.clone()),
        HolderKey::Generic(index) => cargs.generic().get(index).map(|h| h.value.clone()),
    }
}

/// 引用、内部 Bean 和包含它们的列表每次创建都要重新解析
fn needs_re_resolution(value: &Value) -> bool {
    match value {
        Value::Ref(_) | Value::Bean(_) => true,
        Value::List(items) => items.iter().any(needs_re_resolution),
        _ => false,
    }
}

fn describe_type(value: &BeanObject) -> String {
    if value.downcast_ref::<String>().is_some() {
        "String".to_string()
    } else if value.downcast_ref::<i64>().is_some() {
        "i64".to_string()
    } else if value.downcast_ref::<f64>().is_some() {
        "f64".to_string()
    } else if value.downcast_ref::<bool>().is_some() {
        "bool".to_string()
    } else {
        describe(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj<T: std::any::Any + Send + Sync>(v: T) -> Option<BeanObject> {
        Some(Arc::new(v))
    }

    #[test]
    fn test_type_difference_prefers_unconverted_arguments() {
        let params = vec![ParamSpec::of::<i64>()];

        // 原始值就是 i64：-1024
        let exact = ArgumentsHolder {
            raw_arguments: vec![obj(5i64)],
            arguments: vec![obj(5i64)],
            prepared_arguments: vec![],
            resolve_necessary: false,
        };
        assert_eq!(exact.type_difference_weight(&params), -1024);

        // 原始值是字符串，转换后才匹配：0
        let converted = ArgumentsHolder {
            raw_arguments: vec![obj("5".to_string())],
            arguments: vec![obj(5i64)],
            prepared_arguments: vec![],
            resolve_necessary: false,
        };
        assert_eq!(converted.type_difference_weight(&params), 0);
    }

    #[test]
    fn test_any_parameter_costs_more_than_exact() {
        let exact = type_difference_weight(&[ParamSpec::of::<String>()], &[obj("x".to_string())]);
        let any = type_difference_weight(&[ParamSpec::any()], &[obj("x".to_string())]);
        let mismatch = type_difference_weight(&[ParamSpec::of::<i64>()], &[obj("x".to_string())]);
        assert_eq!(exact, 0);
        assert_eq!(any, 2);
        assert_eq!(mismatch, i32::MAX);
        assert_eq!(type_difference_weight(&[ParamSpec::of::<i64>()], &[None]), 0);
    }

    #[test]
    fn test_assignability_weight_levels() {
        let params = vec![ParamSpec::of::<i64>()];
        let holder = |raw: Option<BeanObject>, arg: Option<BeanObject>| ArgumentsHolder {
            raw_arguments: vec![raw],
            arguments: vec![arg],
            prepared_arguments: vec![],
            resolve_necessary: false,
        };
        assert_eq!(
            holder(obj(1i64), obj(1i64)).assignability_weight(&params),
            i32::MAX - 1024
        );
        assert_eq!(
            holder(obj("1".to_string()), obj(1i64)).assignability_weight(&params),
            i32::MAX - 512
        );
        assert_eq!(
            holder(obj("1".to_string()), obj("1".to_string())).assignability_weight(&params),
            i32::MAX
        );
    }

    #[test]
    fn test_re_resolution_needed_for_references() {
        assert!(needs_re_resolution(&Value::Ref("a".into())));
        assert!(needs_re_resolution(&Value::List(vec![Value::Int(1), Value::Ref("a".into())])));
        assert!(!needs_re_resolution(&Value::Str("a".into())));
    }
}
