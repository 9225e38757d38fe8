//! Services the host registers on the application's behalf.

use ahash::AHashSet;
use once_cell::sync::Lazy;

use crate::identity::ServiceIdentity;

/// Simple names of services every generic or web host provides.
static DEFAULT_FRAMEWORK_SERVICES: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "IServiceProvider",
        "IServiceScopeFactory",
        "IServiceProviderIsService",
        "ILogger",
        "ILoggerFactory",
        "IConfiguration",
        "IOptions",
        "IOptionsSnapshot",
        "IOptionsMonitor",
        "IHostEnvironment",
        "IWebHostEnvironment",
        "IHostApplicationLifetime",
        "IHttpContextAccessor",
        "IHttpClientFactory",
        "IMemoryCache",
        "TimeProvider",
    ]
    .into_iter()
    .collect()
});

/// Allow-list consulted when a dependency has no registration.
///
/// Matching is by simple name, so `Microsoft.Extensions.Logging.ILogger<T>`
/// matches `ILogger` regardless of namespace or type arguments.
#[derive(Debug, Clone, Default)]
pub struct FrameworkServices {
    enabled: bool,
    extra: AHashSet<String>,
}

impl FrameworkServices {
    /// Built-in list plus `extra` names, active when `enabled`.
    pub fn new(enabled: bool, extra: &[String]) -> Self {
        Self {
            enabled,
            extra: extra.iter().map(|name| simple(name).to_string()).collect(),
        }
    }

    /// Allow-list that matches nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn contains(&self, identity: &ServiceIdentity) -> bool {
        if !self.enabled {
            return false;
        }
        let name = identity.ty.simple_name();
        DEFAULT_FRAMEWORK_SERVICES.contains(name) || self.extra.contains(name)
    }
}

fn simple(name: &str) -> &str {
    let tail = name.rsplit("::").next().unwrap_or(name);
    tail.rsplit('.').next().unwrap_or(tail)
}
