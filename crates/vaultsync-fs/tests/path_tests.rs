use rstest::rstest;
use vaultsync_fs::{Error, VaultPath};

#[rstest]
#[case("")]
#[case("   ")]
#[case("/etc/passwd")]
#[case("\\\\server\\share\\a.md")]
#[case("C:\\vault\\a.md")]
#[case("../outside.md")]
#[case("notes/../../outside.md")]
#[case("./")]
fn rejects_paths_outside_the_vault(#[case] raw: &str) {
    let err = VaultPath::new(raw).unwrap_err();
    assert!(matches!(err, Error::InvalidPath { .. }), "got {err:?}");
}

#[rstest]
#[case("a.md", "a.md")]
#[case("01. Inbox/SignalPlus Log.md", "01. Inbox/SignalPlus Log.md")]
#[case("notes\\daily\\2024.md", "notes/daily/2024.md")]
#[case("./x//y.md", "x/y.md")]
fn accepts_and_normalizes(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(VaultPath::new(raw).unwrap().as_str(), expected);
}
