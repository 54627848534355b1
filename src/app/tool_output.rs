// Scrollback for the conversion log panel.
// - Collects streamed lines from every stage of a run, capped in size.
// - Follows the tail until the user scrolls up; scrolling back to the
//   bottom resumes following.
use std::cell::Cell;

#[derive(Debug, Clone)]
pub(crate) struct ToolOutput {
    lines: Vec<String>,
    scroll: Cell<usize>,
    last_max_scroll_top: Cell<usize>,
    follow_tail: bool,
}

impl ToolOutput {
    const PAGE_STEP: usize = 12;
    const MAX_LINES: usize = 20_000;

    pub(crate) fn empty() -> Self {
        Self {
            lines: Vec::new(),
            scroll: Cell::new(0),
            last_max_scroll_top: Cell::new(0),
            follow_tail: true,
        }
    }

    /// Starts a fresh run, dropping the previous run's lines.
    pub(crate) fn begin_run(&mut self, header: String) {
        self.lines = vec![header];
        self.scroll.set(0);
        self.follow_tail = true;
    }

    pub(crate) fn begin_stage(&mut self, label: &str, command_line: &str) {
        if !self.lines.is_empty() {
            self.append_line(String::new());
        }
        self.append_line(format!("[{label}]"));
        self.append_line(format!("$ {command_line}"));
    }

    pub(crate) fn append_prefixed(&mut self, prefix: &str, line: &str) {
        self.append_line(format!("{prefix}: {line}"));
    }

    pub(crate) fn append_line(&mut self, line: String) {
        self.lines.push(line);
        self.trim_old_lines_if_needed();
        if self.follow_tail {
            self.scroll.set(self.lines.len().saturating_sub(1));
        }
    }

    pub(crate) fn scroll_down(&mut self) {
        self.move_down(1);
    }

    pub(crate) fn scroll_up(&mut self) {
        self.move_up(1);
    }

    pub(crate) fn page_down(&mut self) {
        self.move_down(Self::PAGE_STEP);
    }

    pub(crate) fn page_up(&mut self) {
        self.move_up(Self::PAGE_STEP);
    }

    pub(crate) fn lines(&self) -> &[String] {
        &self.lines
    }

    pub(crate) fn scroll(&self) -> usize {
        self.scroll.get()
    }

    pub(crate) fn clamped_scroll_for_viewport(&self, visible_line_count: usize) -> usize {
        let visible_line_count = visible_line_count.max(1);
        let max_scroll_top = self.lines.len().saturating_sub(visible_line_count);
        self.last_max_scroll_top.set(max_scroll_top);
        let clamped = self.scroll().min(max_scroll_top);
        self.scroll.set(clamped);
        clamped
    }

    fn move_down(&mut self, step: usize) {
        let max_scroll = self.last_max_scroll_top.get();
        let next = (self.scroll.get() + step).min(max_scroll);
        self.scroll.set(next);
        if next >= max_scroll {
            self.follow_tail = true;
        }
    }

    fn move_up(&mut self, step: usize) {
        self.scroll.set(self.scroll.get().saturating_sub(step));
        self.follow_tail = false;
    }

    fn trim_old_lines_if_needed(&mut self) {
        if self.lines.len() <= Self::MAX_LINES {
            return;
        }

        let overflow = self.lines.len() - Self::MAX_LINES;
        self.lines.drain(0..overflow);
        self.scroll.set(self.scroll.get().saturating_sub(overflow));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(count: usize) -> ToolOutput {
        let mut output = ToolOutput::empty();
        for index in 0..count {
            output.append_line(format!("line {index}"));
        }
        output
    }

    #[test]
    fn stages_accumulate_within_a_run() {
        let mut output = ToolOutput::empty();
        output.begin_run("Converting a.mov".to_string());
        output.begin_stage("Reading metadata", "ffprobe a.mov");
        output.append_prefixed("stderr", "ok");
        output.begin_stage("Converting", "ffmpeg -i a.mov b.mp4");

        assert_eq!(
            output.lines(),
            [
                "Converting a.mov",
                "",
                "[Reading metadata]",
                "$ ffprobe a.mov",
                "stderr: ok",
                "",
                "[Converting]",
                "$ ffmpeg -i a.mov b.mp4",
            ]
        );

        output.begin_run("next".to_string());
        assert_eq!(output.lines(), ["next"]);
    }

    #[test]
    fn scrolling_up_stops_following_until_bottom_is_reached() {
        let mut output = filled(30);
        assert_eq!(output.clamped_scroll_for_viewport(10), 20);

        output.scroll_up();
        output.append_line("new".to_string());
        assert_eq!(output.scroll(), 19);

        output.clamped_scroll_for_viewport(10);
        output.page_down();
        output.append_line("newer".to_string());
        assert_eq!(output.scroll(), output.lines().len() - 1);
    }

    #[test]
    fn old_lines_are_dropped_past_the_cap() {
        let output = filled(ToolOutput::MAX_LINES + 5);
        assert_eq!(output.lines().len(), ToolOutput::MAX_LINES);
        assert_eq!(output.lines()[0], "line 5");
    }
}
