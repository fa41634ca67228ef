//! 统一的容器错误类型
//!
//! 对应 Spring 的 BeansException 体系。用户回调（init / destroy / 工厂闭包）
//! 可以返回任意错误，统一包装进 `ContainerError::Other`。

use thiserror::Error;

/// 容器操作的结果类型
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 找不到指定名称的 Bean 定义
    #[error("No bean named '{0}' available")]
    NoSuchBeanDefinition(String),

    /// 按类型查找时没有候选
    #[error("No qualifying bean of type '{type_name}' available: {message}")]
    NoQualifyingBean { type_name: String, message: String },

    /// 按类型查找时匹配到多个候选
    #[error("No qualifying bean of type '{type_name}' available: expected single matching bean but found {}: {}", candidates.len(), candidates.join(","))]
    NoUniqueBeanDefinition {
        type_name: String,
        candidates: Vec<String>,
    },

    /// 请求的 Bean 正在创建中（无法解析的循环引用）
    #[error("Error creating bean with name '{bean}': {message}")]
    BeanCurrentlyInCreation { bean: String, message: String },

    /// Bean 创建失败
    #[error("Error creating bean with name '{bean}': {message}{}", format_related(related))]
    BeanCreation {
        bean: String,
        message: String,
        #[source]
        source: Option<Box<ContainerError>>,
        /// 创建过程中被吞掉的相关错误
        related: Vec<String>,
    },

    /// 构造函数 / 工厂方法参数无法满足
    #[error("Error creating bean with name '{bean}': Unsatisfied dependency expressed through parameter {index} of type [{type_name}]: {message}")]
    UnsatisfiedDependency {
        bean: String,
        index: usize,
        type_name: String,
        message: String,
        #[source]
        source: Option<Box<ContainerError>>,
    },

    /// Bean 定义非法
    #[error("Invalid bean definition with name '{bean}': {message}")]
    BeanDefinitionStore { bean: String, message: String },

    /// 不允许覆盖已存在的 Bean 定义
    #[error("Cannot register bean definition for bean '{bean}': there is already '{existing}' bound")]
    BeanDefinitionOverride { bean: String, existing: String },

    /// 当前阶段不允许创建 Bean
    #[error("Error creating bean with name '{bean}': {message}")]
    BeanCreationNotAllowed { bean: String, message: String },

    /// 抽象定义不能实例化
    #[error("Error creating bean with name '{0}': Bean definition is abstract")]
    BeanIsAbstract(String),

    /// 类型不匹配
    #[error("Bean named '{bean}' is expected to be of type '{expected}' but was actually of type '{found}'")]
    TypeMismatch {
        bean: String,
        expected: String,
        found: String,
    },

    /// 值转换失败
    #[error("Failed to convert value '{value}' to required type '{required}'")]
    TypeConversion { value: String, required: String },

    /// 别名已注册到其他名称
    #[error("Cannot register alias '{alias}' for name '{name}': It is already registered for name '{registered}'.")]
    AliasConflict {
        alias: String,
        name: String,
        registered: String,
    },

    /// 别名循环引用
    #[error("Cannot register alias '{alias}' for name '{name}': Circular reference - '{name}' is a direct or indirect alias for '{alias}' already")]
    AliasCircle { alias: String, name: String },

    /// 别名不存在
    #[error("No alias '{0}' registered")]
    NoSuchAlias(String),

    /// 配置已冻结
    #[error("Cannot {0}: configuration is frozen")]
    ConfigurationFrozen(String),

    /// 非法状态
    #[error("{0}")]
    IllegalState(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 日志初始化失败
    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    /// 其他错误（用户回调）
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_related(related: &[String]) -> String {
    if related.is_empty() {
        String::new()
    } else {
        format!("; related causes: [{}]", related.join("; "))
    }
}

impl ContainerError {
    /// 构造一个 BeanCreation 错误
    pub fn creation(bean: impl Into<String>, message: impl Into<String>) -> Self {
        ContainerError::BeanCreation {
            bean: bean.into(),
            message: message.into(),
            source: None,
            related: Vec::new(),
        }
    }

    /// 构造带有原因的 BeanCreation 错误
    pub fn creation_caused_by(
        bean: impl Into<String>,
        message: impl Into<String>,
        cause: ContainerError,
    ) -> Self {
        let message = format!("{}; nested exception is {}", message.into(), cause);
        ContainerError::BeanCreation {
            bean: bean.into(),
            message,
            source: Some(Box::new(cause)),
            related: Vec::new(),
        }
    }

    /// 给 BeanCreation 错误附加相关错误，其他错误原样返回
    pub fn with_related(self, causes: Vec<String>) -> Self {
        match self {
            ContainerError::BeanCreation {
                bean,
                message,
                source,
                mut related,
            } => {
                related.extend(causes);
                ContainerError::BeanCreation {
                    bean,
                    message,
                    source,
                    related,
                }
            }
            other => other,
        }
    }

    /// 是否是创建类错误（对应 Java 中的 BeanCreationException 及其子类）
    pub fn is_creation_failure(&self) -> bool {
        matches!(
            self,
            ContainerError::BeanCreation { .. }
                | ContainerError::BeanCurrentlyInCreation { .. }
                | ContainerError::UnsatisfiedDependency { .. }
                | ContainerError::BeanCreationNotAllowed { .. }
        )
    }

    /// 错误链中是否存在“正在创建中”的错误
    pub fn is_currently_in_creation(&self) -> bool {
        match self {
            ContainerError::BeanCurrentlyInCreation { .. } => true,
            ContainerError::BeanCreation {
                source: Some(cause),
                ..
            }
            | ContainerError::UnsatisfiedDependency {
                source: Some(cause),
                ..
            } => cause.is_currently_in_creation(),
            _ => false,
        }
    }
}
