// src/proxy/exports.rs

//! Export table of the original system library and generation of the
//! descriptor files that accompany the proxy artifact.
//!
//! The entry-point list is fixed: it is the complete export surface of
//! `version.dll` and the forwarding shim must cover all of it.

/// Entry points exported by the original system library.
pub const VERSION_EXPORTS: [&str; 17] = [
    "GetFileVersionInfoA",
    "GetFileVersionInfoByHandle",
    "GetFileVersionInfoExA",
    "GetFileVersionInfoExW",
    "GetFileVersionInfoSizeA",
    "GetFileVersionInfoSizeExA",
    "GetFileVersionInfoSizeExW",
    "GetFileVersionInfoSizeW",
    "GetFileVersionInfoW",
    "VerFindFileA",
    "VerFindFileW",
    "VerInstallFileA",
    "VerInstallFileW",
    "VerLanguageNameA",
    "VerLanguageNameW",
    "VerQueryValueA",
    "VerQueryValueW",
];

/// Transient loader configuration written next to the proxy. Consumed by
/// the injected library; removed on cleanup.
pub const TEMP_CONFIG_JSON: &str = r#"{
  "enable_console": true,
  "enable_hook": true,
  "enable_http_server": false,
  "enable_event_helper": false,
  "dumpGameAssemblyPath": "GameAssembly_dumped.dll",
  "dump_entries": true,
  "no_static_dict_cache": false,
  "enable_replaceBuiltInAssets": false,
  "openExternalPluginOnLoad": false,
  "autoChangeLineBreakMode": false,
  "start_width": -1,
  "start_height": -1,
  "closeTrans": {"enable": false},
  "g_enable_console": true,
  "g_enable_hook": true,
  "g_enable_http_server": false,
  "g_enable_event_helper": false,
  "g_dump_entries": true,
  "g_no_static_dict_cache": false,
  "g_enable_replaceBuiltInAssets": false,
  "g_dump_sprite_tex": false,
  "g_dump_bundle_tex": false,
  "g_aspect_ratio": 0.0,
  "g_home_free_camera": false,
  "g_home_walk_chara_id": 0,
  "enableRaceInfoTab": false,
  "raceInfoTabAttachToGame": false,
  "loadDll": []
}
"#;

/// Render the module definition file mapping each public export to its
/// forwarding stub.
pub fn module_definition(exports: &[&str]) -> String {
    let mut out = String::from("; Module definition for the version.dll proxy\n\nEXPORTS\n");
    for name in exports {
        out.push_str(&format!("    {name}={name}_EXPORT\n"));
    }
    out.push_str("\n; DLL entry point\n    DllMain=DllMain\n");
    out
}

/// Render the assembly stub file: one forwarding jump per export, reading
/// the resolved original entry points.
pub fn assembly_exports(exports: &[&str]) -> String {
    let mut out = String::from(
        "; Assembly exports for the version.dll proxy\n\n\
         .386\n.model flat, stdcall\noption casemap:none\n\n\
         include windows.inc\n\n\
         ; Original entry points resolved from the system library\n",
    );
    for name in exports {
        out.push_str(&format!("extern {name}_Original:DWORD\n"));
    }
    out.push_str("\n; Forwarding stubs\n");
    for name in exports {
        out.push_str(&format!(
            "{name}_EXPORT proc\n    jmp {name}_Original\n{name}_EXPORT endp\n\n"
        ));
    }
    out.push_str(
        "DllMain proc hInstance:DWORD, reason:DWORD, reserved:DWORD\n\
         \x20   mov eax, TRUE\n\
         \x20   ret\n\
         DllMain endp\n\nend\n",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_definition_covers_every_export() {
        let def = module_definition(&VERSION_EXPORTS);
        for name in VERSION_EXPORTS {
            assert!(def.contains(&format!("{name}={name}_EXPORT")), "{name}");
        }
        assert!(def.contains("DllMain=DllMain"));
    }

    #[test]
    fn assembly_exports_emit_one_stub_per_export() {
        let asm = assembly_exports(&VERSION_EXPORTS);
        for name in VERSION_EXPORTS {
            assert!(asm.contains(&format!("extern {name}_Original:DWORD")));
            assert!(asm.contains(&format!("{name}_EXPORT proc")));
            assert!(asm.contains(&format!("{name}_EXPORT endp")));
        }
        assert_eq!(asm.matches(" endp").count(), VERSION_EXPORTS.len() + 1);
    }
}
