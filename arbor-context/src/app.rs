use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_beans::ClassRegistry;
use arbor_core::{ContainerResult, EnvironmentPropertySource, LoggingConfig, TomlPropertySource};

use crate::context::{ApplicationContext, ApplicationContextBuilder};
use crate::placeholder::PropertyPlaceholderConfigurer;

type Initializer = Box<dyn Fn(&Arc<ApplicationContext>) -> ContainerResult<()> + Send + Sync>;

/// Arbor 应用程序
///
/// 提供便捷的应用启动方式：加载配置、读取 Bean 定义、扫描组件、刷新上下文
pub struct ArborApplication {
    /// 应用名称
    name: String,
    /// 配置文件路径
    config_files: Vec<String>,
    /// 环境变量前缀
    env_prefix: String,
    /// 激活的 profiles
    profiles: Vec<String>,
    /// 是否显示 banner
    show_banner: bool,
    /// 是否初始化日志
    init_logging: bool,
    logging_config: Option<LoggingConfig>,
    /// TOML Bean 定义文件
    definition_files: Vec<PathBuf>,
    classes: ClassRegistry,
    /// 是否注册占位符配置器
    resolve_placeholders: bool,
    scan_components: bool,
    /// 自定义初始化函数
    initializers: Vec<Initializer>,
}

impl ArborApplication {
    /// 创建新的应用
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_files: vec!["application.toml".to_string()],
            env_prefix: "APP_".to_string(),
            profiles: Vec::new(),
            show_banner: true,
            init_logging: true,
            logging_config: None,
            definition_files: Vec::new(),
            classes: ClassRegistry::new(),
            resolve_placeholders: true,
            scan_components: true,
            initializers: Vec::new(),
        }
    }

    /// 设置配置文件路径
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_files = vec![path.into()];
        self
    }

    /// 添加多个配置文件
    pub fn config_files(mut self, paths: Vec<String>) -> Self {
        self.config_files = paths;
        self
    }

    /// 设置环境变量前缀
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// 设置激活的 profiles
    pub fn profiles(mut self, profiles: Vec<String>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }

    /// 设置日志配置
    ///
    /// 如果不设置，将使用默认配置（从环境变量读取）
    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 关闭日志初始化（已经由调用方安装了 subscriber 时使用）
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// 添加 TOML Bean 定义文件
    pub fn bean_definitions(mut self, path: impl Into<PathBuf>) -> Self {
        self.definition_files.push(path.into());
        self
    }

    /// 定义文件中 `class` 引用的类型元数据
    pub fn classes(mut self, classes: ClassRegistry) -> Self {
        self.classes = classes;
        self
    }

    /// 是否在刷新前解析定义中的 `${...}` 占位符，默认开启
    pub fn resolve_placeholders(mut self, enabled: bool) -> Self {
        self.resolve_placeholders = enabled;
        self
    }

    /// 是否注册 `component!` 提交的组件，默认开启
    pub fn scan_components(mut self, enabled: bool) -> Self {
        self.scan_components = enabled;
        self
    }

    /// 添加初始化器，在组件扫描和刷新之前执行
    pub fn initializer<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<ApplicationContext>) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.initializers.push(Box::new(f));
        self
    }

    /// 运行应用
    pub fn run(self) -> ContainerResult<Arc<ApplicationContext>> {
        let start_time = std::time::Instant::now();

        if self.show_banner {
            self.print_banner();
        }

        // 优先级：代码设置 > 环境变量 APP_PROFILES_ACTIVE
        let mut active_profiles = self.profiles.clone();
        if active_profiles.is_empty() {
            if let Ok(profiles_str) = std::env::var(format!("{}PROFILES_ACTIVE", self.env_prefix)) {
                active_profiles = profiles_str
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }

        let mut builder = ApplicationContext::builder().app_name(self.name.clone());
        self.load_configurations(&mut builder, &active_profiles)?;

        // 环境变量配置源优先级最高
        builder = builder.add_property_source(Box::new(EnvironmentPropertySource::new(&self.env_prefix)));

        let context = builder.set_active_profiles(active_profiles.clone()).build()?;

        // 日志级别可以写在配置文件的 [logging] 段，所以等 Environment 就绪后再初始化
        if self.init_logging {
            let logging_config = match &self.logging_config {
                Some(config) => config.clone(),
                None => LoggingConfig::from_environment(context.environment())?,
            };
            logging_config.init()?;
        }

        tracing::info!("Starting {} application", self.name);
        if !active_profiles.is_empty() {
            tracing::info!("Active profiles: {:?}", active_profiles);
        } else {
            tracing::info!("No active profiles set, using default configuration");
        }
        tracing::debug!("Environment variable prefix: {}", self.env_prefix);

        if self.resolve_placeholders {
            context.add_bean_factory_post_processor(Arc::new(PropertyPlaceholderConfigurer::new(
                context.environment().clone(),
            )));
        }

        for path in &self.definition_files {
            let count = context.load_bean_definitions(path, &self.classes)?;
            tracing::info!("Loaded {} bean definition(s) from {}", count, path.display());
        }

        for initializer in &self.initializers {
            initializer(&context)?;
        }

        if self.scan_components {
            context.scan_components()?;
        }

        tracing::info!("Validating bean dependencies");
        context.validate_dependencies()?;

        context.refresh()?;

        tracing::info!("Started {} in {}ms", self.name, start_time.elapsed().as_millis());
        Ok(context)
    }

    /// 加载配置文件
    ///
    /// 加载顺序（优先级从低到高）：
    /// 1. application.toml
    /// 2. application-{profile}.toml
    fn load_configurations(
        &self,
        builder: &mut ApplicationContextBuilder,
        active_profiles: &[String],
    ) -> ContainerResult<()> {
        for base_config in &self.config_files {
            self.try_load_config_file(builder, base_config, 0)?;
        }

        for (index, profile) in active_profiles.iter().enumerate() {
            for base_config in &self.config_files {
                let profile_config = profile_config_path(base_config, profile);
                self.try_load_config_file(builder, &profile_config, 10 + index as i32)?;
            }
        }

        Ok(())
    }

    fn try_load_config_file(
        &self,
        builder: &mut ApplicationContextBuilder,
        config_file: &str,
        priority: i32,
    ) -> ContainerResult<()> {
        if !Path::new(config_file).exists() {
            tracing::debug!("Configuration file not found: {}", config_file);
            return Ok(());
        }
        let source = TomlPropertySource::from_file(config_file)?;
        tracing::info!("Loaded configuration from: {} (priority: {})", config_file, priority);
        builder.add_property_source_mut(Box::new(source.with_priority(priority)));
        Ok(())
    }

    fn print_banner(&self) {
        println!();
        println!(r"     _         _                ");
        println!(r"    / \   _ __| |__   ___  _ __ ");
        println!(r"   / _ \ | '__| '_ \ / _ \| '__|");
        println!(r"  / ___ \| |  | |_) | (_) | |   ");
        println!(r" /_/   \_\_|  |_.__/ \___/|_|   ");
        println!();
        println!("  :: Arbor ::        (v{})", env!("CARGO_PKG_VERSION"));
        println!();
    }
}

impl Default for ArborApplication {
    fn default() -> Self {
        Self::new("ArborApplication")
    }
}

/// application.toml -> application-dev.toml
fn profile_config_path(base_path: &str, profile: &str) -> String {
    match base_path.rfind('.') {
        Some(dot_pos) => {
            let (name, ext) = base_path.split_at(dot_pos);
            format!("{}-{}{}", name, profile, ext)
        }
        None => format!("{}-{}", base_path, profile),
    }
}
