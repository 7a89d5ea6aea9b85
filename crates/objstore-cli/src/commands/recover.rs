use anyhow::{Result, bail};
use objstore_engine::RecoveryReport;

/// Print what opening the store repaired. `None` means another process had
/// the store open, so recovery could not run.
pub fn handle(report: Option<RecoveryReport>) -> Result<()> {
    let Some(report) = report else {
        bail!("object store is in use by another process; stop it and run recover again");
    };

    if report.is_clean() {
        println!("✓ Store is consistent");
        return Ok(());
    }

    println!("✓ Recovery complete");
    println!("  Staged blobs published: {}", report.published);
    println!("  Staged blobs discarded: {}", report.discarded);
    println!("  Orphan blobs removed: {}", report.orphans_removed);
    println!("  Dangling records removed: {}", report.dangling_removed);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recover_requires_exclusive_open() {
        let err = handle(None).unwrap_err();
        assert!(err.to_string().contains("in use"));
    }

    #[test]
    fn test_recover_reports_repairs() {
        handle(Some(RecoveryReport::default())).unwrap();
        handle(Some(RecoveryReport {
            discarded: 1,
            ..Default::default()
        }))
        .unwrap();
    }
}
