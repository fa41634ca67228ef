//! 定义中的值：构造参数、属性值以及字符串到目标类型的转换

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use arbor_core::{ContainerError, ContainerResult};

use crate::class::ParamSpec;
use crate::definition::BeanDefinition;
use crate::BeanObject;

/// 定义中的一个值
#[derive(Clone)]
pub enum Value {
    /// 空值
    Null,
    /// 字符串，按目标类型按需转换
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// 对另一个 Bean 的引用
    Ref(String),
    /// 内部 Bean
    Bean(Box<BeanDefinition>),
    List(Vec<Value>),
    /// 已经构建好的实例
    Object(BeanObject),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Value::Ref(name.into())
    }

    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Value::Object(Arc::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 值不经转换能否直接赋给参数
    pub fn is_assignable_to(&self, param: &ParamSpec) -> bool {
        if param.accepts_any {
            return true;
        }
        let id = param.type_id;
        match self {
            Value::Null => true,
            Value::Str(_) => id == TypeId::of::<String>(),
            Value::Int(_) => id == TypeId::of::<i64>(),
            Value::Float(_) => id == TypeId::of::<f64>(),
            Value::Bool(_) => id == TypeId::of::<bool>(),
            Value::List(_) => id == TypeId::of::<Vec<BeanObject>>(),
            Value::Object(obj) => param.is_assignable(obj),
            Value::Ref(_) | Value::Bean(_) => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Ref(name) => write!(f, "<{}>", name),
            Value::Bean(def) => write!(f, "inner bean {:?}", def.class_name()),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Object(obj) => write!(f, "object({})", describe(obj)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<BeanDefinition> for Value {
    fn from(def: BeanDefinition) -> Self {
        Value::Bean(Box::new(def))
    }
}

/// 构造参数值，可带类型名和参数名限定
#[derive(Clone, Debug)]
pub struct ValueHolder {
    pub value: Value,
    pub type_name: Option<String>,
    pub name: Option<String>,
    /// 已转换好的值，存在时跳过类型转换
    pub converted: Option<BeanObject>,
}

impl ValueHolder {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            type_name: None,
            name: None,
            converted: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_converted(mut self, converted: BeanObject) -> Self {
        self.converted = Some(converted);
        self
    }

    /// 保留类型名 / 参数名限定，替换为解析后的值
    pub fn resolved(&self, value: Value) -> ValueHolder {
        ValueHolder {
            value,
            type_name: self.type_name.clone(),
            name: self.name.clone(),
            converted: self.converted.clone(),
        }
    }

    fn matches_type(&self, param: Option<&ParamSpec>) -> bool {
        match &self.type_name {
            None => true,
            Some(type_name) => param.map_or(false, |p| p.matches_type_name(type_name)),
        }
    }

    fn matches_name(&self, name: Option<&str>) -> bool {
        match &self.name {
            None => true,
            Some(own) => name.map_or(false, |n| n.is_empty() || n == own),
        }
    }
}

/// 构造参数中某个值的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HolderKey {
    Indexed(usize),
    Generic(usize),
}

/// 构造参数集合：按下标的参数 + 通用参数
#[derive(Clone, Debug, Default)]
pub struct ConstructorArgumentValues {
    indexed: BTreeMap<usize, ValueHolder>,
    generic: Vec<ValueHolder>,
}

impl ConstructorArgumentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_indexed(&mut self, index: usize, holder: ValueHolder) {
        self.indexed.insert(index, holder);
    }

    pub fn add_generic(&mut self, holder: ValueHolder) {
        self.generic.push(holder);
    }

    pub fn has_indexed(&self, index: usize) -> bool {
        self.indexed.contains_key(&index)
    }

    pub fn indexed(&self) -> &BTreeMap<usize, ValueHolder> {
        &self.indexed
    }

    pub fn generic(&self) -> &[ValueHolder] {
        &self.generic
    }

    /// 所有参数（先下标参数，后通用参数）的可变引用
    pub fn holders_mut(&mut self) -> impl Iterator<Item = &mut ValueHolder> {
        self.indexed.values_mut().chain(self.generic.iter_mut())
    }

    pub fn argument_count(&self) -> usize {
        self.indexed.len() + self.generic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.generic.is_empty()
    }

    /// 把 other 的参数合并进来，下标参数以 other 为准
    pub fn add_all(&mut self, other: &ConstructorArgumentValues) {
        for (index, holder) in &other.indexed {
            self.indexed.insert(*index, holder.clone());
        }
        self.generic.extend(other.generic.iter().cloned());
    }

    pub fn get_indexed_argument_value(
        &self,
        index: usize,
        param: Option<&ParamSpec>,
        name: Option<&str>,
    ) -> Option<&ValueHolder> {
        self.indexed
            .get(&index)
            .filter(|holder| holder.matches_type(param) && holder.matches_name(name))
    }

    /// 查找未使用过的通用参数
    ///
    /// 没有类型名和参数名限定的值必须能直接赋给参数
    pub fn get_generic_argument_value(
        &self,
        param: Option<&ParamSpec>,
        name: Option<&str>,
        used: &HashSet<HolderKey>,
    ) -> Option<(HolderKey, &ValueHolder)> {
        for (i, holder) in self.generic.iter().enumerate() {
            let key = HolderKey::Generic(i);
            if used.contains(&key) {
                continue;
            }
            if let Some(own) = &holder.name {
                if name.map_or(true, |n| n != own) {
                    continue;
                }
            }
            if let Some(type_name) = &holder.type_name {
                if !param.map_or(false, |p| p.matches_type_name(type_name)) {
                    continue;
                }
            }
            if let Some(p) = param {
                if holder.type_name.is_none()
                    && holder.name.is_none()
                    && !holder.value.is_assignable_to(p)
                {
                    continue;
                }
            }
            return Some((key, holder));
        }
        None
    }

    pub fn get_argument_value(
        &self,
        index: usize,
        param: Option<&ParamSpec>,
        name: Option<&str>,
        used: &HashSet<HolderKey>,
    ) -> Option<(HolderKey, &ValueHolder)> {
        if let Some(holder) = self.get_indexed_argument_value(index, param, name) {
            return Some((HolderKey::Indexed(index), holder));
        }
        self.get_generic_argument_value(param, name, used)
    }
}

/// 有序的属性值
#[derive(Clone, Debug, Default)]
pub struct PropertyValues {
    values: Vec<(String, Value)>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加属性，同名属性被替换
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.values.iter().position(|(n, _)| n == name)?;
        Some(self.values.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.values.iter_mut().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn add_all(&mut self, other: &PropertyValues) {
        for (name, value) in other.iter() {
            self.add(name, value.clone());
        }
    }
}

/// 简单描述一个实例，用于错误信息
pub fn describe(value: &BeanObject) -> String {
    if let Some(s) = value.downcast_ref::<String>() {
        return s.clone();
    }
    if let Some(v) = value.downcast_ref::<i64>() {
        return v.to_string();
    }
    if let Some(v) = value.downcast_ref::<f64>() {
        return v.to_string();
    }
    if let Some(v) = value.downcast_ref::<bool>() {
        return v.to_string();
    }
    if value.downcast_ref::<Vec<BeanObject>>().is_some() {
        return "list".to_string();
    }
    "object".to_string()
}

fn boxed<T: Any + Send + Sync>(value: T) -> Option<BeanObject> {
    Some(Arc::new(value))
}

fn conversion_error(value: &BeanObject, param: &ParamSpec) -> ContainerError {
    ContainerError::TypeConversion {
        value: describe(value),
        required: param.type_name.to_string(),
    }
}

macro_rules! parse_scalar {
    ($text:expr, $param:expr, $source:expr, $($t:ty),+) => {
        $(
            if $param.type_id == TypeId::of::<$t>() {
                return $text
                    .trim()
                    .parse::<$t>()
                    .map(boxed)
                    .map_err(|_| conversion_error($source, $param));
            }
        )+
    };
}

macro_rules! narrow_int {
    ($value:expr, $param:expr, $source:expr, $($t:ty),+) => {
        $(
            if $param.type_id == TypeId::of::<$t>() {
                return <$t>::try_from($value)
                    .map(boxed)
                    .map_err(|_| conversion_error($source, $param));
            }
        )+
    };
}

/// 把解析后的值转换成参数要求的类型
///
/// 支持：同类型直接通过、字符串到标量、整数间转换、整数到浮点、标量到字符串、
/// 列表元素逐个转换
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeConverter;

impl TypeConverter {
    pub fn new() -> Self {
        TypeConverter
    }

    pub fn convert_if_necessary(
        &self,
        value: Option<BeanObject>,
        param: &ParamSpec,
    ) -> ContainerResult<Option<BeanObject>> {
        let value = match value {
            None => return Ok(None),
            Some(value) => value,
        };
        if param.is_assignable(&value) {
            return Ok(Some(value));
        }

        if let Some(text) = value.downcast_ref::<String>() {
            if param.type_id == TypeId::of::<char>() {
                let mut chars = text.chars();
                return match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(boxed(c)),
                    _ => Err(conversion_error(&value, param)),
                };
            }
            if param.type_id == TypeId::of::<bool>() {
                return match text.trim().to_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => Ok(boxed(true)),
                    "false" | "off" | "no" | "0" => Ok(boxed(false)),
                    _ => Err(conversion_error(&value, param)),
                };
            }
            parse_scalar!(text, param, &value, i64, i32, i16, i8, u64, u32, u16, u8, usize, isize, f64, f32);
        }

        if let Some(&number) = value.downcast_ref::<i64>() {
            narrow_int!(number, param, &value, i32, i16, i8, u64, u32, u16, u8, usize, isize);
            if param.type_id == TypeId::of::<f64>() {
                return Ok(boxed(number as f64));
            }
            if param.type_id == TypeId::of::<f32>() {
                return Ok(boxed(number as f32));
            }
        }

        if let Some(&number) = value.downcast_ref::<f64>() {
            if param.type_id == TypeId::of::<f32>() {
                return Ok(boxed(number as f32));
            }
        }

        if param.type_id == TypeId::of::<String>() {
            let text = if let Some(v) = value.downcast_ref::<i64>() {
                Some(v.to_string())
            } else if let Some(v) = value.downcast_ref::<f64>() {
                Some(v.to_string())
            } else if let Some(v) = value.downcast_ref::<bool>() {
                Some(v.to_string())
            } else {
                None
            };
            if let Some(text) = text {
                return Ok(boxed(text));
            }
        }

        if let Some(items) = value.downcast_ref::<Vec<BeanObject>>() {
            if let Some(converted) = self.convert_list(items, param)? {
                return Ok(Some(converted));
            }
        }

        Err(conversion_error(&value, param))
    }

    fn convert_list(
        &self,
        items: &[BeanObject],
        param: &ParamSpec,
    ) -> ContainerResult<Option<BeanObject>> {
        fn each<T: Any + Send + Sync + Clone>(
            converter: &TypeConverter,
            items: &[BeanObject],
        ) -> ContainerResult<Vec<T>> {
            let element = ParamSpec::of::<T>();
            items
                .iter()
                .map(|item| {
                    let converted = converter
                        .convert_if_necessary(Some(item.clone()), &element)?
                        .ok_or_else(|| ContainerError::TypeConversion {
                            value: "null".to_string(),
                            required: element.type_name.to_string(),
                        })?;
                    converted
                        .downcast_ref::<T>()
                        .cloned()
                        .ok_or_else(|| conversion_error(item, &element))
                })
                .collect()
        }

        let id = param.type_id;
        let converted: BeanObject = if id == TypeId::of::<Vec<String>>() {
            Arc::new(each::<String>(self, items)?)
        } else if id == TypeId::of::<Vec<i64>>() {
            Arc::new(each::<i64>(self, items)?)
        } else if id == TypeId::of::<Vec<i32>>() {
            Arc::new(each::<i32>(self, items)?)
        } else if id == TypeId::of::<Vec<f64>>() {
            Arc::new(each::<f64>(self, items)?)
        } else if id == TypeId::of::<Vec<bool>>() {
            Arc::new(each::<bool>(self, items)?)
        } else {
            return Ok(None);
        };
        Ok(Some(converted))
    }
}
