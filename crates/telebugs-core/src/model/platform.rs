//! Project platform codes.

use serde::{Serialize, Serializer};

/// Display names indexed by the application's platform code.
pub const PLATFORM_NAMES: [&str; 167] = [
    "Ruby", "Ruby on Rails", "PHP", "Laravel", "JavaScript", // 0
    "Android", "Apple", "Dart", "Flutter", "Elixir", // 5
    "Phoenix", "Oban", "Quantum", "tvOS", "macOS", // 10
    "visionOS", "watchOS", "iOS", "Unreal Engine", "Unity", // 15
    "Rust", "DelayedJob", "Rack Middleware", "Resque", "Sidekiq", // 20
    "React Native", "React", "Python", "Go", "Echo", // 25
    "FastHTTP", "Fiber", "Gin", "Iris", "Logrus", // 30
    "Negroni", "net/http", "Slog", "Zerolog", "Godot Engine", // 35
    "Java", "java.util.logging", "Log4j 2x", "Logback", "Servlet", // 40
    "Spring", "Spring Boot", "Angular", "Astro", "AWS Lambda (JavaScript)", // 45
    "Azure Functions (JavaScript)", "Bun", "Capacitor", "Cloudflare", "Connect", // 50
    "Cordova", "Deno", "Electron", "Ember", "Express", // 55
    "Fastify", "Gatsby", "Google Cloud Functions (JavaScript)", "Hapi", "Hono", // 60
    "Koa", "Nest.js", "Next.js", "Node.js", "Nuxt", // 65
    "React Router Framework", "Remix", "Solid", "SolidStart", "Svelte", // 70
    "SvelteKit", "TanStack Start React", "Vue", "Wasm", "Kotlin", // 75
    "Kotlin Multiplatform", "Native", "Google Breakpad", "Google Crashpad", "Minidumps", // 80
    "Qt", "WebAssembly", ".NET", "ASP.NET", "ASP.NET Core", // 85
    "AWS Lambda (.NET)", "Azure Functions (.NET)", "Google Cloud Functions (.NET)", "Blazor WebAssembly", "Entity Framework", // 90
    "log4net", "Microsoft.Extensions.Logging", "NLog", "Serilog", "UWP", // 95
    "Windows Forms", "WPF", "MAUI", "Xamarin", "Nintendo Switch", // 100
    "Symfony", "PowerShell", "AIOHTTP", "Anthropic", "Apache Airflow", // 105
    "Apache Beam", "Apache Spark", "Ariadne", "arq", "ASGI", // 110
    "asyncio", "asyncpg", "AWS Lambda (Python)", "Boto3", "Bottle", // 115
    "Celery", "Chalice", "clickhouse-driver", "Cloud Resource Context", "Cohere", // 120
    "Django", "Dramatiq", "Falcon", "FastAPI", "Flask", // 125
    "GNU Backtrace", "Google Cloud Functions (Python)", "GQL", "Graphene", "gRPC", // 130
    "HTTPX", "huey", "Huggingface Hub", "Langchain", "LaunchDarkly", // 135
    "Litestar", "Logging", "Loguru", "OpenAI", "OpenFeature", // 140
    "pure_eval", "PyMongo", "Pyramid", "Quart", "Ray", // 145
    "Redis", "RQ (Redis Queue)", "Rust Tracing", "Sanic", "Serverless", // 150
    "Socket", "SQLAlchemy", "Starlette", "Statsig", "Strawberry", // 155
    "sys.exit", "Tornado", "Tryton", "Typer", "Unleash", // 160
    "WSGI", "Default Integrations", // 165
];

/// A project's platform, or `Unknown` for null and unmapped codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Known(&'static str),
    Unknown,
}

impl Platform {
    #[must_use]
    pub fn from_code(code: Option<i64>) -> Self {
        code.and_then(|c| usize::try_from(c).ok())
            .and_then(|index| PLATFORM_NAMES.get(index))
            .map_or(Self::Unknown, |name| Self::Known(*name))
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Known(name) => name,
            Self::Unknown => "unknown",
        }
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
