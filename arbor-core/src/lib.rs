// arbor-core: 容器的基础设施
//
// 提供 IoC 容器各层共用的基础能力：
// - 统一错误类型
// - 别名注册表（alias -> canonical name）
// - Environment / 配置源 / 占位符解析
// - 日志初始化

pub mod alias;
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;

pub use alias::{AliasRegistry, SimpleAliasRegistry, StringValueResolver};
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PlaceholderResolver,
    PropertySource, TomlPropertySource,
};
pub use error::{ContainerError, ContainerResult};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
