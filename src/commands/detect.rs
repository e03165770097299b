//! Command: report the detected platform.
use crate::exec::SystemExecutor;
use crate::logging::Log;
use crate::platform::Platform;

/// Run the detect command.
pub fn run(log: &dyn Log) {
    let platform = Platform::detect(&SystemExecutor);
    for line in report(&platform) {
        log.info(&line);
    }
}

/// Human-readable `key: value` lines describing `platform`.
#[must_use]
pub fn report(platform: &Platform) -> Vec<String> {
    fn or_none<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "none".to_string(), |v| v.to_string())
    }

    vec![
        format!("os:              {}", platform.os),
        format!("distribution:    {}", or_none(platform.distro.as_deref())),
        format!("package manager: {}", or_none(platform.package_manager)),
        format!("desktop:         {}", or_none(platform.desktop.as_ref())),
        format!("root:            {}", if platform.is_root { "yes" } else { "no" }),
    ]
}
