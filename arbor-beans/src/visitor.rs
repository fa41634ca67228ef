//! 遍历定义中的字符串值并用解析器替换（占位符解析使用）

use arbor_core::{ContainerResult, StringValueResolver};

use crate::definition::BeanDefinition;
use crate::value::{PropertyValues, Value};

/// 定义访问器
///
/// 访问父定义名、工厂 Bean 名、工厂方法名、属性值和构造参数，
/// 内部 Bean 和列表递归处理。解析结果为空的字符串变成 `Value::Null`。
pub struct BeanDefinitionVisitor<'a> {
    resolver: &'a dyn StringValueResolver,
}

impl<'a> BeanDefinitionVisitor<'a> {
    pub fn new(resolver: &'a dyn StringValueResolver) -> Self {
        Self { resolver }
    }

    pub fn visit_bean_definition(&self, definition: &mut BeanDefinition) -> ContainerResult<()> {
        self.visit_name(&mut definition.parent_name)?;
        self.visit_name(&mut definition.factory_bean_name)?;
        self.visit_name(&mut definition.factory_method_name)?;
        self.visit_property_values(&mut definition.property_values)?;
        for holder in definition.constructor_args.holders_mut() {
            // 已转换的值不再参与解析
            if holder.converted.is_none() {
                self.visit_value(&mut holder.value)?;
            }
        }
        Ok(())
    }

    fn visit_name(&self, name: &mut Option<String>) -> ContainerResult<()> {
        if let Some(current) = name.as_ref() {
            let resolved = self.resolver.resolve_string_value(current)?;
            if resolved.as_deref() != Some(current.as_str()) {
                *name = resolved;
            }
        }
        Ok(())
    }

    fn visit_property_values(&self, pvs: &mut PropertyValues) -> ContainerResult<()> {
        for (_, value) in pvs.iter_mut() {
            self.visit_value(value)?;
        }
        Ok(())
    }

    fn visit_value(&self, value: &mut Value) -> ContainerResult<()> {
        match value {
            Value::Str(text) => {
                *value = match self.resolver.resolve_string_value(text)? {
                    Some(resolved) => Value::Str(resolved),
                    None => Value::Null,
                };
            }
            Value::Ref(name) => {
                if let Some(resolved) = self.resolver.resolve_string_value(name)? {
                    *name = resolved;
                }
            }
            Value::Bean(inner) => self.visit_bean_definition(inner)?,
            Value::List(items) => {
                for item in items.iter_mut() {
                    self.visit_value(item)?;
                }
            }
            Value::Null | Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::Object(_) => {}
        }
        Ok(())
    }
}
