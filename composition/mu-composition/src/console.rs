//! コンソール上のオペレーターとセッションログ
//!
//! 問い合わせは標準エラーへ出す（`--json` の標準出力を汚さない）。

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::path::Path;

use mu_domain::model::ProcessRecord;
use mu_domain::port::driven::{Operator, SessionLog};

/// セッションログの表示先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Stdout,
    Stderr,
    Silent,
}

/// 画面へ出しつつ、保存用に全行を保持するセッションログ
#[derive(Debug)]
pub struct ConsoleLog {
    echo: Echo,
    lines: RefCell<Vec<String>>,
}

impl ConsoleLog {
    pub fn new(echo: Echo) -> Self {
        Self {
            echo,
            lines: RefCell::new(Vec::new()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl SessionLog for ConsoleLog {
    fn append(&self, line: &str) {
        match self.echo {
            Echo::Stdout => println!("{}", line),
            Echo::Stderr => eprintln!("{}", line),
            Echo::Silent => {}
        }
        self.lines.borrow_mut().push(line.to_string());
    }
}

/// 更新対象の選び方
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// 発見されたもの全て
    All,
    /// 指定 pid のうち発見されたもの
    Pids(Vec<u32>),
    /// 一覧を出して入力させる
    Prompt,
}

pub struct ConsoleOperator {
    selection: Selection,
    assume_yes: bool,
    input: RefCell<Box<dyn BufRead>>,
    output: RefCell<Box<dyn Write>>,
}

impl ConsoleOperator {
    pub fn stdio(selection: Selection, assume_yes: bool) -> Self {
        Self::with_io(
            selection,
            assume_yes,
            Box::new(io::BufReader::new(io::stdin())),
            Box::new(io::stderr()),
        )
    }

    pub fn with_io(
        selection: Selection,
        assume_yes: bool,
        input: Box<dyn BufRead>,
        output: Box<dyn Write>,
    ) -> Self {
        Self {
            selection,
            assume_yes,
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    fn say(&self, line: &str) {
        let mut out = self.output.borrow_mut();
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }

    /// 1行読む。EOF や読み取り失敗は None
    fn ask(&self, question: &str) -> Option<String> {
        {
            let mut out = self.output.borrow_mut();
            let _ = write!(out, "{}", question);
            let _ = out.flush();
        }
        let mut line = String::new();
        match self.input.borrow_mut().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let answer = self
            .ask(&format!("{} [y/N]: ", question))
            .unwrap_or_default()
            .to_ascii_lowercase();
        answer == "y" || answer == "yes"
    }

    fn print_candidates(&self, records: &[ProcessRecord]) {
        self.say("Update candidates:");
        for rec in records {
            self.say(&format!(
                "  PID {:>6}  v{:<12} {:<24} {}{}",
                rec.pid,
                rec.product_version,
                rec.owner().unwrap_or("-"),
                rec.display_path(),
                if rec.title.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", rec.title)
                }
            ));
        }
    }
}

/// `all` / `*` なら全件、それ以外はカンマ・空白区切りの pid（候補外は捨てる）
pub fn parse_selection(answer: &str, available: &[u32]) -> Vec<u32> {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("all") || answer == "*" {
        return available.to_vec();
    }
    let mut chosen = Vec::new();
    for token in answer.split(|c: char| c == ',' || c.is_whitespace()) {
        let Ok(pid) = token.trim().parse::<u32>() else {
            continue;
        };
        if available.contains(&pid) && !chosen.contains(&pid) {
            chosen.push(pid);
        }
    }
    chosen
}

impl Operator for ConsoleOperator {
    fn select(&self, records: &[ProcessRecord]) -> Vec<u32> {
        let available: Vec<u32> = records.iter().map(|r| r.pid).collect();
        match &self.selection {
            Selection::All => available,
            Selection::Pids(pids) => {
                for pid in pids.iter().filter(|p| !available.contains(p)) {
                    self.say(&format!("PID {} is not an update candidate; ignored", pid));
                }
                parse_selection(
                    &pids
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join(","),
                    &available,
                )
            }
            Selection::Prompt => {
                self.print_candidates(records);
                self.ask("Select PIDs to update (comma separated, 'all', blank to cancel): ")
                    .map(|answer| parse_selection(&answer, &available))
                    .unwrap_or_default()
            }
        }
    }

    fn confirm_update(&self, count: usize, installer: &Path) -> bool {
        self.confirm(&format!(
            "Stop {} process(es) and run {}?",
            count,
            installer.display()
        ))
    }

    fn confirm_download(&self, file_name: &str) -> bool {
        self.confirm(&format!("Download {}?", file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mu_domain::DomainError;
    use mu_domain::model::{DiscoveredProcess, SecurityContext, TargetProcess};
    use std::io::Cursor;
    use std::rc::Rc;
    use std::time::Duration;

    struct Idle(u32);

    impl TargetProcess for Idle {
        fn pid(&self) -> u32 {
            self.0
        }
        fn has_exited(&self) -> bool {
            false
        }
        fn request_close(&self) -> bool {
            true
        }
        fn wait_for_exit(&self, _timeout: Option<Duration>) -> bool {
            true
        }
        fn kill(&self) -> Result<(), DomainError> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Rc<RefCell<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    fn record(pid: u32) -> ProcessRecord {
        let discovered = DiscoveredProcess {
            pid,
            image_name: "ProScan".into(),
            known_path: None,
            title: String::new(),
            started_at: None,
            process: Box::new(Idle(pid)),
        };
        ProcessRecord::new(discovered, "22.1", SecurityContext::default())
    }

    fn operator(selection: Selection, yes: bool, input: &str) -> (ConsoleOperator, Captured) {
        let out = Captured::default();
        let op = ConsoleOperator::with_io(
            selection,
            yes,
            Box::new(Cursor::new(input.to_string().into_bytes())),
            Box::new(out.clone()),
        );
        (op, out)
    }

    #[test]
    fn parse_selection_filters_and_dedups() {
        let available = [10, 20, 30];
        assert_eq!(parse_selection("20, 10 20 99 x", &available), vec![20, 10]);
        assert_eq!(parse_selection("ALL", &available), vec![10, 20, 30]);
        assert_eq!(parse_selection("", &available), Vec::<u32>::new());
    }

    #[test]
    fn prompt_selection_reads_answer() {
        let (op, out) = operator(Selection::Prompt, false, "30\n");
        let records = vec![record(10), record(30)];
        assert_eq!(op.select(&records), vec![30]);
        let text = out.text();
        assert!(text.contains("Update candidates:"));
        assert!(text.contains("PID     10"));
    }

    #[test]
    fn prompt_at_eof_selects_nothing() {
        let (op, _) = operator(Selection::Prompt, false, "");
        assert!(op.select(&[record(10)]).is_empty());
    }

    #[test]
    fn explicit_pids_ignore_unknown() {
        let (op, out) = operator(Selection::Pids(vec![10, 77]), false, "");
        assert_eq!(op.select(&[record(10), record(20)]), vec![10]);
        assert!(out.text().contains("PID 77 is not an update candidate"));
    }

    #[test]
    fn all_selects_every_record() {
        let (op, _) = operator(Selection::All, false, "");
        assert_eq!(op.select(&[record(10), record(20)]), vec![10, 20]);
    }

    #[test]
    fn confirmation_defaults_to_no() {
        let (op, _) = operator(Selection::All, false, "\n");
        assert!(!op.confirm_update(2, Path::new("setup.exe")));
        let (op, _) = operator(Selection::All, false, "Yes\n");
        assert!(op.confirm_download("proscan.zip"));
    }

    #[test]
    fn assume_yes_skips_prompt() {
        let (op, out) = operator(Selection::All, true, "");
        assert!(op.confirm_update(1, Path::new("setup.exe")));
        assert!(out.text().is_empty());
    }

    #[test]
    fn console_log_keeps_lines() {
        let log = ConsoleLog::new(Echo::Silent);
        log.append("one");
        log.append("two");
        assert_eq!(log.lines(), vec!["one".to_string(), "two".to_string()]);
    }
}
