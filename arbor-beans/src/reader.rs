//! TOML 格式的 Bean 定义读取器
//!
//! ```toml
//! [[bean]]
//! id = "orderService"
//! class = "OrderService"
//! name = "orders, orderManager"
//! depends-on = ["dataSource"]
//!
//! [[bean.constructor-arg]]
//! index = 0
//! ref = "orderRepository"
//!
//! [[bean.property]]
//! name = "timeout"
//! value = "${order.timeout:30}"
//!
//! [[alias]]
//! name = "orderService"
//! alias = "legacyOrders"
//! ```
//!
//! `class` 通过 `ClassRegistry` 解析成类型元数据。

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use arbor_core::utils::naming::{unique_bean_name, GENERATED_BEAN_NAME_SEPARATOR};
use arbor_core::{AliasRegistry, ContainerError, ContainerResult};

use crate::class::ClassRegistry;
use crate::definition::{AutowireMode, BeanDefinition};
use crate::factory::{BeanDefinitionRegistry, DefaultListableBeanFactory};
use crate::value::{PropertyValues, Value, ValueHolder};
use crate::Scope;

/// 名称列表：单个字符串（逗号 / 分号 / 空白分隔）或字符串数组
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NameList {
    Delimited(String),
    List(Vec<String>),
}

impl NameList {
    fn into_names(self) -> Vec<String> {
        let names = match self {
            NameList::Delimited(text) => text
                .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .map(str::to_string)
                .collect(),
            NameList::List(names) => names,
        };
        names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BeansDocument {
    #[serde(default)]
    bean: Vec<BeanElement>,
    #[serde(default)]
    alias: Vec<AliasElement>,
}

#[derive(Debug, Deserialize)]
struct AliasElement {
    name: String,
    alias: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BeanElement {
    id: Option<String>,
    class: Option<String>,
    name: Option<NameList>,
    parent: Option<String>,
    scope: Option<String>,
    #[serde(default)]
    lazy_init: bool,
    #[serde(default)]
    primary: bool,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
    autowire: Option<AutowireMode>,
    autowire_candidate: Option<bool>,
    depends_on: Option<NameList>,
    factory_bean: Option<String>,
    factory_method: Option<String>,
    init_method: Option<String>,
    destroy_method: Option<String>,
    description: Option<String>,
    #[serde(default)]
    constructor_arg: Vec<ConstructorArgElement>,
    #[serde(default)]
    property: Vec<PropertyElement>,
}

#[derive(Debug, Deserialize)]
struct ConstructorArgElement {
    index: Option<i64>,
    #[serde(rename = "type")]
    type_name: Option<String>,
    name: Option<String>,
    #[serde(flatten)]
    value: ValueElement,
}

#[derive(Debug, Deserialize)]
struct PropertyElement {
    name: String,
    #[serde(flatten)]
    value: ValueElement,
}

/// value / ref / bean / list / null 中恰好一个
#[derive(Debug, Default, Deserialize)]
struct ValueElement {
    value: Option<toml::Value>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    bean: Option<Box<BeanElement>>,
    list: Option<Vec<ValueElement>>,
    #[serde(default)]
    null: bool,
}

/// 从 TOML 读取定义并注册到工厂
pub struct TomlBeanDefinitionReader<'a> {
    factory: &'a DefaultListableBeanFactory,
    classes: &'a ClassRegistry,
}

impl<'a> TomlBeanDefinitionReader<'a> {
    pub fn new(factory: &'a DefaultListableBeanFactory, classes: &'a ClassRegistry) -> Self {
        Self { factory, classes }
    }

    /// 读取文件，返回注册的定义数量
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> ContainerResult<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ContainerError::Config(format!(
                "Could not read bean definitions from {}: {}",
                path.display(),
                e
            ))
        })?;
        let count = self.load_from_str(&content)?;
        tracing::debug!("Loaded {} bean definitions from {}", count, path.display());
        Ok(count)
    }

    /// 解析 TOML 文本，返回注册的定义数量
    pub fn load_from_str(&self, content: &str) -> ContainerResult<usize> {
        let document: BeansDocument = toml::from_str(content).map_err(|e| {
            ContainerError::Config(format!("Invalid bean definition document: {}", e))
        })?;

        // 工厂方法产物的类型也需要登记元数据
        for class in self.classes.classes() {
            self.factory.register_class(class.clone());
        }

        let mut used_names = HashSet::new();
        let mut count = 0;
        for element in document.bean {
            self.register_bean_element(element, &mut used_names)?;
            count += 1;
        }
        for alias in &document.alias {
            self.factory.register_alias(&alias.name, &alias.alias)?;
        }
        Ok(count)
    }

    fn register_bean_element(
        &self,
        mut element: BeanElement,
        used_names: &mut HashSet<String>,
    ) -> ContainerResult<()> {
        let mut aliases = element
            .name
            .take()
            .map(NameList::into_names)
            .unwrap_or_default();
        let mut bean_name = element.id.take().filter(|id| !id.trim().is_empty());
        if bean_name.is_none() && !aliases.is_empty() {
            let first = aliases.remove(0);
            tracing::trace!(
                "No 'id' specified - using '{}' as bean name and {:?} as aliases",
                first,
                aliases
            );
            bean_name = Some(first);
        }

        if let Some(name) = &bean_name {
            let taken = std::iter::once(name)
                .chain(aliases.iter())
                .find(|n| used_names.contains(n.as_str()));
            if let Some(taken) = taken {
                return Err(ContainerError::BeanDefinitionStore {
                    bean: name.clone(),
                    message: format!("Bean name '{}' is already used in this document", taken),
                });
            }
        }

        let definition = self.parse_bean_definition(bean_name.as_deref(), &element)?;

        let bean_name = match bean_name {
            Some(name) => name,
            None => {
                let base = generated_name_base(&definition).ok_or_else(|| {
                    ContainerError::BeanDefinitionStore {
                        bean: "(unnamed)".to_string(),
                        message: "Unnamed bean definition specifies neither 'class' nor 'parent' nor 'factory-bean' - can't generate bean name".to_string(),
                    }
                })?;
                let generated = unique_bean_name(&base, |candidate| {
                    self.factory.is_bean_name_in_use(candidate) || used_names.contains(candidate)
                });
                // 类名本身还没被占用时作为别名
                if !self.factory.is_bean_name_in_use(&base) && !used_names.contains(&base) {
                    aliases.push(base);
                }
                tracing::trace!("Neither 'id' nor 'name' specified - using generated bean name [{}]", generated);
                generated
            }
        };

        used_names.insert(bean_name.clone());
        used_names.extend(aliases.iter().cloned());

        self.factory.register_bean_definition(&bean_name, definition)?;
        for alias in &aliases {
            self.factory.register_alias(&bean_name, alias)?;
        }
        Ok(())
    }

    fn parse_bean_definition(
        &self,
        bean_name: Option<&str>,
        element: &BeanElement,
    ) -> ContainerResult<BeanDefinition> {
        let display_name = bean_name.unwrap_or("(inner bean)");
        let store_error = |message: String| ContainerError::BeanDefinitionStore {
            bean: display_name.to_string(),
            message,
        };

        let mut definition = BeanDefinition::new();
        if let Some(class_name) = &element.class {
            match self.classes.get(class_name) {
                Some(class) => {
                    definition = BeanDefinition::of_class(class);
                }
                None => {
                    return Err(store_error(format!(
                        "Bean class [{}] not found in class registry",
                        class_name
                    )))
                }
            }
        }

        definition.parent_name = element.parent.clone();
        if let Some(scope) = &element.scope {
            definition.scope = Some(scope.parse::<Scope>().map_err(store_error)?);
        }
        definition.lazy = element.lazy_init;
        definition.primary = element.primary;
        definition.is_abstract = element.is_abstract;
        if let Some(mode) = element.autowire {
            definition.autowire_mode = mode;
        }
        if let Some(candidate) = element.autowire_candidate {
            definition.autowire_candidate = candidate;
        }
        if let Some(depends_on) = element.depends_on.clone() {
            definition.depends_on = depends_on.into_names();
        }
        definition.factory_bean_name = element.factory_bean.clone();
        definition.factory_method_name = element.factory_method.clone();
        if let Some(init) = element.init_method.as_deref().filter(|m| !m.is_empty()) {
            definition = definition.with_init_method(init);
        }
        if let Some(destroy) = element.destroy_method.as_deref().filter(|m| !m.is_empty()) {
            definition = definition.with_destroy_method(destroy);
        }
        definition.description = element.description.clone();

        for arg in &element.constructor_arg {
            let value = self.parse_value(display_name, "constructor-arg", &arg.value)?;
            let mut holder = ValueHolder::new(value);
            if let Some(type_name) = &arg.type_name {
                holder = holder.with_type(type_name.clone());
            }
            if let Some(name) = &arg.name {
                holder = holder.with_name(name.clone());
            }
            match arg.index {
                Some(index) if index < 0 => {
                    return Err(store_error("'index' cannot be lower than 0".to_string()));
                }
                Some(index) => {
                    let index = index as usize;
                    if definition.constructor_args.has_indexed(index) {
                        return Err(store_error(format!(
                            "Ambiguous constructor-arg entries for index {}",
                            index
                        )));
                    }
                    definition.constructor_args.add_indexed(index, holder);
                }
                None => definition.constructor_args.add_generic(holder),
            }
        }

        let mut properties = PropertyValues::new();
        for property in &element.property {
            if property.name.is_empty() {
                return Err(store_error("Tag 'property' must have a 'name' attribute".to_string()));
            }
            if properties.contains(&property.name) {
                return Err(store_error(format!(
                    "Multiple 'property' definitions for property '{}'",
                    property.name
                )));
            }
            let element_name = format!("property '{}'", property.name);
            let value = self.parse_value(display_name, &element_name, &property.value)?;
            properties.add(property.name.clone(), value);
        }
        definition.property_values = properties;

        Ok(definition)
    }

    fn parse_value(&self, bean_name: &str, element_name: &str, element: &ValueElement) -> ContainerResult<Value> {
        let given = [
            element.value.is_some(),
            element.reference.is_some(),
            element.bean.is_some(),
            element.list.is_some(),
            element.null,
        ]
        .iter()
        .filter(|given| **given)
        .count();
        if given != 1 {
            return Err(ContainerError::BeanDefinitionStore {
                bean: bean_name.to_string(),
                message: format!(
                    "{} must specify exactly one of 'value', 'ref', 'bean', 'list' or 'null'",
                    element_name
                ),
            });
        }

        if element.null {
            return Ok(Value::Null);
        }
        if let Some(reference) = &element.reference {
            if reference.trim().is_empty() {
                return Err(ContainerError::BeanDefinitionStore {
                    bean: bean_name.to_string(),
                    message: format!("{} contains empty 'ref' attribute", element_name),
                });
            }
            return Ok(Value::Ref(reference.clone()));
        }
        if let Some(inner) = &element.bean {
            return Ok(Value::Bean(Box::new(self.parse_bean_definition(None, inner)?)));
        }
        if let Some(items) = &element.list {
            let mut values = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let item_name = format!("{} element [{}]", element_name, i);
                values.push(self.parse_value(bean_name, &item_name, item)?);
            }
            return Ok(Value::List(values));
        }
        match &element.value {
            Some(value) => literal_value(bean_name, element_name, value),
            None => Ok(Value::Null),
        }
    }
}

fn literal_value(bean_name: &str, element_name: &str, value: &toml::Value) -> ContainerResult<Value> {
    Ok(match value {
        toml::Value::String(s) => Value::Str(s.clone()),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(f) => Value::Float(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::Str(dt.to_string()),
        toml::Value::Array(items) => Value::List(
            items
                .iter()
                .map(|item| literal_value(bean_name, element_name, item))
                .collect::<ContainerResult<Vec<_>>>()?,
        ),
        toml::Value::Table(_) => {
            return Err(ContainerError::BeanDefinitionStore {
                bean: bean_name.to_string(),
                message: format!(
                    "{}: tables are only allowed as inner bean definitions ('bean = {{ ... }}')",
                    element_name
                ),
            })
        }
    })
}

/// 未命名定义的名称基础：类名，或者 `父定义$child` / `工厂Bean$created`
fn generated_name_base(definition: &BeanDefinition) -> Option<String> {
    if let Some(class_name) = definition.class_name() {
        return Some(class_name.to_string());
    }
    if let Some(parent) = &definition.parent_name {
        return Some(format!("{}$child", parent));
    }
    definition
        .factory_bean_name
        .as_ref()
        .map(|factory| format!("{}$created", factory))
}

/// 生成名称是否由读取器产生（`类名#序号`）
pub fn is_generated_name(name: &str) -> bool {
    name.rsplit_once(GENERATED_BEAN_NAME_SEPARATOR)
        .map_or(false, |(_, counter)| !counter.is_empty() && counter.chars().all(|c| c.is_ascii_digit()))
}
