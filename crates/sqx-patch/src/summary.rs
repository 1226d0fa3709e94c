//! Human-readable listing of the requested changes.

use sqx_config::PatchConfig;

/// List every configured value under its section title.
///
/// Sections without keys are left out. Values are shown as they will be
/// written to the document.
pub fn summarize(config: &PatchConfig) -> String {
    let blocks: Vec<String> = config
        .sections()
        .filter(|(_, entries)| !entries.is_empty())
        .map(|(section, entries)| {
            let mut block = format!("{}:", section.title());
            for (key, value) in entries.iter() {
                block.push_str(&format!("\n  • {key} = {}", value.to_patch_string()));
            }
            block
        })
        .collect();
    blocks.join("\n\n")
}
