/// オペレーター向けのセッションログ
pub trait SessionLog {
    fn append(&self, line: &str);
}
