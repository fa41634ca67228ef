use std::any::Any;
use std::sync::Arc;

use arbor_beans::{BeanClass, BeanDefinition, Scope};
use arbor_core::utils::naming;
use arbor_core::ContainerResult;

use crate::context::ApplicationContext;

/// Component注册函数类型
pub type ComponentRegistrar = fn(&ApplicationContext) -> ContainerResult<()>;

/// Component注册表 - 用于inventory收集
pub struct ComponentRegistry {
    pub registrar: ComponentRegistrar,
    pub name: &'static str,
}

inventory::collect!(ComponentRegistry);

/// Component trait - 用于标记可以自动注册到容器的组件
///
/// 实现后用 [`component!`](crate::component!) 宏提交到注册表，上下文刷新时自动注册
///
/// # 示例
///
/// ```ignore
/// use arbor_context::prelude::*;
///
/// struct UserService {
///     repository: Arc<UserRepository>,
/// }
///
/// impl Component for UserService {
///     fn bean_class() -> Arc<BeanClass> {
///         BeanClass::builder::<UserService>("UserService")
///             .constructor(vec![ParamSpec::of::<UserRepository>()], |args| {
///                 Ok(UserService { repository: args.get(0)? })
///             })
///             .build()
///     }
/// }
///
/// arbor_context::component!(UserService);
/// ```
pub trait Component: Any + Send + Sync + Sized {
    /// 类型元数据（构造函数、属性、回调）
    fn bean_class() -> Arc<BeanClass>;

    /// 获取 Bean 名称，默认为类型短名的 camelCase
    fn bean_name() -> String {
        naming::generate_bean_name(std::any::type_name::<Self>())
    }

    /// 别名
    fn aliases() -> Vec<String> {
        Vec::new()
    }

    /// 获取作用域
    fn scope() -> Scope {
        Scope::Singleton
    }

    /// 是否延迟初始化
    fn lazy() -> bool {
        false
    }

    fn primary() -> bool {
        false
    }

    /// 获取依赖的 bean 名称列表
    fn depends_on() -> Vec<String> {
        Vec::new()
    }

    /// 构建定义，需要更多定制（init/destroy 方法、属性值）时覆盖
    fn definition() -> BeanDefinition {
        BeanDefinition::of_class(Self::bean_class())
            .with_scope(Self::scope())
            .with_lazy(Self::lazy())
            .with_primary(Self::primary())
            .with_depends_on(Self::depends_on())
    }

    /// 注册到容器
    fn register(context: &ApplicationContext) -> ContainerResult<()> {
        let name = Self::bean_name();
        context.register_bean_definition(&name, Self::definition())?;
        for alias in Self::aliases() {
            context.register_alias(&name, &alias)?;
        }
        Ok(())
    }
}

/// 把实现了 [`Component`] 的类型提交到组件注册表
#[macro_export]
macro_rules! component {
    ($ty:ty) => {
        $crate::inventory::submit! {
            $crate::component::ComponentRegistry {
                registrar: <$ty as $crate::component::Component>::register,
                name: ::std::stringify!($ty),
            }
        }
    };
}

impl ApplicationContext {
    /// 自动扫描并注册所有Component
    pub fn scan_components(&self) -> ContainerResult<()> {
        tracing::info!("Starting component scan");

        let components: Vec<_> = inventory::iter::<ComponentRegistry>().collect();
        let total = components.len();

        if total == 0 {
            tracing::debug!("No components submitted for registration");
            return Ok(());
        }

        tracing::info!("Found {} component(s) to register", total);

        for (idx, component) in components.iter().enumerate() {
            tracing::debug!(
                "Registering component [{}/{}]: '{}'",
                idx + 1,
                total,
                component.name
            );

            (component.registrar)(self).map_err(|e| {
                tracing::error!("Failed to register component '{}': {}", component.name, e);
                e
            })?;
        }

        tracing::info!("Component scan completed successfully, registered {} bean(s)", total);
        Ok(())
    }
}
