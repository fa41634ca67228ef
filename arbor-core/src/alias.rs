//! 别名注册表
//!
//! 维护 alias -> name 的映射，name 本身也可以是另一个别名，解析时传递跟随直到
//! 得到规范名称。注册时检测循环引用。

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{ContainerError, ContainerResult};

/// 字符串值解析器（例如占位符解析）
///
/// 返回 `None` 表示该值解析后为空，调用方应丢弃对应条目
pub trait StringValueResolver: Send + Sync {
    fn resolve_string_value(&self, value: &str) -> ContainerResult<Option<String>>;
}

impl<F> StringValueResolver for F
where
    F: Fn(&str) -> ContainerResult<Option<String>> + Send + Sync,
{
    fn resolve_string_value(&self, value: &str) -> ContainerResult<Option<String>> {
        self(value)
    }
}

/// 别名注册表接口
pub trait AliasRegistry {
    /// 为 name 注册别名
    fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()>;

    /// 移除别名
    fn remove_alias(&self, alias: &str) -> ContainerResult<()>;

    /// 判断给定名称是否是别名
    fn is_alias(&self, name: &str) -> bool;

    /// 获取 name 的所有别名（包括别名的别名）
    fn get_aliases(&self, name: &str) -> Vec<String>;
}

/// 基于 HashMap 的别名注册表
#[derive(Debug)]
pub struct SimpleAliasRegistry {
    /// alias -> 注册名
    alias_map: RwLock<HashMap<String, String>>,

    allow_alias_overriding: bool,
}

impl SimpleAliasRegistry {
    pub fn new() -> Self {
        Self {
            alias_map: RwLock::new(HashMap::new()),
            allow_alias_overriding: true,
        }
    }

    /// 设置是否允许别名覆盖（把已存在的别名重新指向其他名称）
    pub fn with_alias_overriding(mut self, allow: bool) -> Self {
        self.allow_alias_overriding = allow;
        self
    }

    pub fn set_allow_alias_overriding(&mut self, allow: bool) {
        self.allow_alias_overriding = allow;
    }

    pub fn allow_alias_overriding(&self) -> bool {
        self.allow_alias_overriding
    }

    /// 解析规范名称：沿着 alias 链一直走到不再是别名的名称
    pub fn canonical_name(&self, name: &str) -> String {
        let aliases = self.alias_map.read();
        Self::canonical_in(&aliases, name)
    }

    fn canonical_in(aliases: &HashMap<String, String>, name: &str) -> String {
        let mut canonical = name;
        while let Some(resolved) = aliases.get(canonical) {
            canonical = resolved.as_str();
        }
        canonical.to_string()
    }

    fn check_for_alias_circle(
        aliases: &HashMap<String, String>,
        name: &str,
        alias: &str,
    ) -> ContainerResult<()> {
        if alias == Self::canonical_in(aliases, name) {
            return Err(ContainerError::AliasCircle {
                alias: alias.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn retrieve_aliases(aliases: &HashMap<String, String>, name: &str, result: &mut Vec<String>) {
        for (alias, registered) in aliases.iter() {
            if registered == name {
                result.push(alias.clone());
                Self::retrieve_aliases(aliases, alias, result);
            }
        }
    }

    /// 使用解析器重写所有别名和目标名称
    ///
    /// 解析结果为空或 alias 与 name 相同的条目会被移除
    pub fn resolve_aliases(&self, resolver: &dyn StringValueResolver) -> ContainerResult<()> {
        let mut aliases = self.alias_map.write();
        let snapshot: Vec<(String, String)> =
            aliases.iter().map(|(a, n)| (a.clone(), n.clone())).collect();

        for (alias, registered_name) in snapshot {
            let resolved_alias = resolver.resolve_string_value(&alias)?;
            let resolved_name = resolver.resolve_string_value(&registered_name)?;

            match (resolved_alias, resolved_name) {
                (Some(resolved_alias), Some(resolved_name)) if resolved_alias != resolved_name => {
                    if resolved_alias != alias {
                        if let Some(existing) = aliases.get(&resolved_alias) {
                            if *existing != resolved_name {
                                return Err(ContainerError::AliasConflict {
                                    alias: resolved_alias,
                                    name: resolved_name,
                                    registered: registered_name,
                                });
                            }
                        }
                        Self::check_for_alias_circle(&aliases, &resolved_name, &resolved_alias)?;
                        aliases.remove(&alias);
                        aliases.insert(resolved_alias, resolved_name);
                    } else if registered_name != resolved_name {
                        aliases.insert(alias, resolved_name);
                    }
                }
                _ => {
                    tracing::debug!("Removing alias '{}' after value resolution", alias);
                    aliases.remove(&alias);
                }
            }
        }
        Ok(())
    }
}

impl Default for SimpleAliasRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasRegistry for SimpleAliasRegistry {
    fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()> {
        if name.trim().is_empty() {
            return Err(ContainerError::IllegalState("'name' must not be empty".to_string()));
        }
        if alias.trim().is_empty() {
            return Err(ContainerError::IllegalState("'alias' must not be empty".to_string()));
        }

        let mut aliases = self.alias_map.write();
        if alias == name {
            aliases.remove(alias);
            return Ok(());
        }

        if !self.allow_alias_overriding {
            if let Some(registered) = aliases.get(alias) {
                if registered != name {
                    return Err(ContainerError::AliasConflict {
                        alias: alias.to_string(),
                        name: name.to_string(),
                        registered: registered.clone(),
                    });
                }
            }
        }

        Self::check_for_alias_circle(&aliases, name, alias)?;
        aliases.insert(alias.to_string(), name.to_string());
        tracing::trace!("Registered alias '{}' for name '{}'", alias, name);
        Ok(())
    }

    fn remove_alias(&self, alias: &str) -> ContainerResult<()> {
        self.alias_map
            .write()
            .remove(alias)
            .map(|_| ())
            .ok_or_else(|| ContainerError::NoSuchAlias(alias.to_string()))
    }

    fn is_alias(&self, name: &str) -> bool {
        self.alias_map.read().contains_key(name)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        let aliases = self.alias_map.read();
        let mut result = Vec::new();
        Self::retrieve_aliases(&aliases, name, &mut result);
        result
    }
}
