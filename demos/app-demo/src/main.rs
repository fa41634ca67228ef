use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use arbor_context::prelude::*;

// ==================== 数据访问 ====================

/// 连接工厂 - 通过静态工厂方法 `create` 创建
struct ConnectionFactory {
    url: String,
    max_connections: Mutex<i64>,
    opened: AtomicUsize,
}

/// 由连接工厂的实例工厂方法 `open` 创建
struct Connection {
    label: String,
    url: String,
}

impl ConnectionFactory {
    fn open(&self, label: &str) -> ContainerResult<Connection> {
        let opened = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let max = *self.max_connections.lock();
        if opened as i64 > max {
            return Err(ContainerError::IllegalState(format!(
                "Connection pool exhausted ({} max)",
                max
            )));
        }
        Ok(Connection {
            label: label.to_string(),
            url: self.url.clone(),
        })
    }
}

// ==================== 业务服务 ====================

struct ServerService {
    connections: Arc<ConnectionFactory>,
    bind_address: Mutex<String>,
}

impl ServerService {
    fn start(&self) -> ContainerResult<()> {
        println!("🚀 Server binding to {}", self.bind_address.lock());
        println!("   Database: {}", self.connections.url);
        Ok(())
    }

    fn stop(&self) -> ContainerResult<()> {
        println!("👋 Server on {} shutting down", self.bind_address.lock());
        Ok(())
    }
}

/// 组件方式注册：按类型注入 ServerService
struct RequestHandler {
    server: Arc<ServerService>,
    handled: AtomicUsize,
}

impl RequestHandler {
    fn handle(&self, path: &str) {
        let count = self.handled.fetch_add(1, Ordering::SeqCst) + 1;
        println!(
            "🔧 [{}] {} via {}",
            count,
            path,
            self.server.bind_address.lock()
        );
    }
}

impl Component for RequestHandler {
    fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<RequestHandler>("RequestHandler")
            .constructor(vec![ParamSpec::of::<ServerService>()], |args| {
                Ok(RequestHandler {
                    server: args.get::<ServerService>(0)?,
                    handled: AtomicUsize::new(0),
                })
            })
            .build()
    }
}

arbor_context::component!(RequestHandler);

/// 记录每个 Bean 的初始化
struct CreationLogger;

impl BeanPostProcessor for CreationLogger {
    fn post_process_after_initialization(&self, bean: BeanObject, bean_name: &str) -> ContainerResult<BeanObject> {
        tracing::info!("Bean '{}' is ready", bean_name);
        Ok(bean)
    }

    fn name(&self) -> &str {
        "CreationLogger"
    }
}

impl Component for CreationLogger {
    fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<CreationLogger>("CreationLogger")
            .default_constructor(|| CreationLogger)
            .bean_post_processor()
            .build()
    }
}

arbor_context::component!(CreationLogger);

// ==================== 类型元数据 ====================

fn classes() -> ClassRegistry {
    ClassRegistry::new()
        .with(
            BeanClass::builder::<ConnectionFactory>("ConnectionFactory")
                .static_factory::<ConnectionFactory, _>(
                    "create",
                    vec![ParamSpec::of::<String>().named("url")],
                    |args| {
                        Ok(ConnectionFactory {
                            url: args.value::<String>(0)?,
                            max_connections: Mutex::new(1),
                            opened: AtomicUsize::new(0),
                        })
                    },
                )
                .instance_factory::<Connection, _>(
                    "open",
                    vec![ParamSpec::of::<String>().named("label")],
                    |factory, args| factory.open(&args.value::<String>(0)?),
                )
                .property("max-connections", |f: &ConnectionFactory, v: Arc<i64>| {
                    *f.max_connections.lock() = *v;
                    Ok(())
                })
                .build(),
        )
        .with(
            BeanClass::builder::<ServerService>("ServerService")
                .constructor(vec![ParamSpec::of::<ConnectionFactory>()], |args| {
                    Ok(ServerService {
                        connections: args.get::<ConnectionFactory>(0)?,
                        bind_address: Mutex::new(String::new()),
                    })
                })
                .property("bind-address", |s: &ServerService, v: Arc<String>| {
                    *s.bind_address.lock() = (*v).clone();
                    Ok(())
                })
                .method("start", ServerService::start)
                .method("stop", ServerService::stop)
                .build(),
        )
}

// ==================== 主程序 ====================

fn main() -> anyhow::Result<()> {
    let base = Path::new(env!("CARGO_MANIFEST_DIR"));

    // 自动完成：
    //   1. 加载 application.toml 和环境变量（APP_ 前缀）
    //   2. 读取 beans.toml 中的定义
    //   3. 注册 component! 提交的组件
    //   4. 解析 ${...} 占位符，注册 BeanPostProcessor
    //   5. 预实例化所有非延迟单例
    let context = ArborApplication::new("ArborDemo")
        .config_file(base.join("application.toml").to_string_lossy().to_string())
        .bean_definitions(base.join("beans.toml"))
        .classes(classes())
        .run()?;

    {
        let handler = context.get_bean_by_type::<RequestHandler>()?;
        handler.handle("/api/users");
        handler.handle("/api/orders");

        // 延迟初始化的连接，在第一次获取时创建
        let connection = context.get_bean_of::<Connection>("primaryConnection")?;
        println!("🗄️  Connection '{}' -> {}", connection.label, connection.url);

        let server = context.get_bean_of::<ServerService>("httpServer")?;
        println!(
            "📦 {} v{} serving on {}",
            context.environment().get_string_or("app.name", "unknown"),
            context.environment().get_string_or("app.version", "0.0.0"),
            server.bind_address.lock()
        );
    }

    println!("\n💡 Try these commands:");
    println!("   APP_SERVER_PORT=9000 cargo run -p app-demo");
    println!("   APP_DATABASE_HOST=prod-db cargo run -p app-demo");
    println!();

    context.close();
    Ok(())
}
