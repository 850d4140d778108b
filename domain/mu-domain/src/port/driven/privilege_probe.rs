/// 実行中プロセス自身の権限情報
pub trait PrivilegeProbe {
    fn is_elevated(&self) -> bool;

    /// `DOMAIN\user`
    fn current_identity(&self) -> Option<String>;
}
