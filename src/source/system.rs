// Author: Dustin Pilgrim
// License: MIT

use once_cell::sync::Lazy;
use sysinfo::{Product, System};

use crate::convert::from_path_map;
use crate::origin::Origin;
use crate::value::{ConfigObject, Value};

static SYSTEM_PROPERTIES: Lazy<Value> = Lazy::new(load_system_properties);

/// Facts about the host as a nested object of strings, e.g. `os.name` or `cpu.count`.
///
/// Gathered once per process. Facts the platform cannot report are left out.
pub fn system_properties() -> Value {
    SYSTEM_PROPERTIES.clone()
}

fn gather() -> Vec<(&'static str, String)> {
    let sys = System::new_all();
    let mut props = Vec::new();

    let mut add = |key: &'static str, value: Option<String>| {
        if let Some(v) = value {
            props.push((key, v));
        }
    };

    add("os.name", System::name());
    add("os.version", System::os_version());
    add("os.arch", Some(System::cpu_arch()));
    add("kernel.version", System::kernel_version());
    add("host.name", System::host_name());
    add("product.name", Product::name());
    add("cpu.count", Some(sys.cpus().len().to_string()));
    add(
        "user.home",
        dirs::home_dir().map(|p| p.to_string_lossy().into_owned()),
    );
    add(
        "user.dir",
        std::env::current_dir()
            .ok()
            .map(|p| p.to_string_lossy().into_owned()),
    );
    props
}

fn load_system_properties() -> Value {
    let props = gather();
    log::debug!("gathered {} system properties", props.len());
    from_path_map(props, Some("system properties")).unwrap_or_else(|e| {
        log::warn!("could not build system properties: {}", e);
        Value::from_object(Origin::new("system properties"), ConfigObject::empty())
    })
}
