use std::path::Path;

use anyhow::Context;

use psatose_core::psa::Psa;

pub fn list(path: &Path) -> anyhow::Result<()> {
    let psa = Psa::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;

    println!("{}:", path.display());

    for diagnostic in psa.diagnostics() {
        println!("  warning: {}", diagnostic);
    }

    if let Some(bones) = psa.bones() {
        println!("  bones ({}):", bones.len());
        for (index, bone) in bones.iter().enumerate() {
            println!(
                "    {:>3} {} (parent {}, {} children)",
                index, bone.name, bone.parent_index, bone.children_count
            );
        }
    }

    if let Some(infos) = psa.anim_infos() {
        println!("  animations ({}):", infos.len());
        for info in infos {
            println!(
                "    {} [{}]: {} frames at {} fps, bones {}..{}, {} keys",
                info.name,
                info.group,
                info.raw_frame_count,
                info.animation_rate,
                info.start_bone,
                info.bone_count,
                info.key_count()
            );
        }
    }

    if let Some(keys) = psa.anim_keys() {
        println!("  keys: {}", keys.len());
    }

    for kind in psa.missing_chunks() {
        println!("  missing or empty: {}", kind);
    }

    Ok(())
}
