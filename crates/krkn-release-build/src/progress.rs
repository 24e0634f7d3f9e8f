use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// ビルド中のスピナー
///
/// 端末でない場合 (CI) はスピナーが描画されず、ログ行だけが出力される。
pub struct BuildProgress {
    progress_bar: ProgressBar,
}

impl BuildProgress {
    pub fn new(image: &str) -> Self {
        let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(format!("Building {}...", image));

        Self { progress_bar: pb }
    }

    /// スピナーを退避させて1行出力 (stdout は結果出力用に空けておく)
    pub fn print(&self, line: &str) {
        self.progress_bar.suspend(|| eprint!("{}", line));
        self.progress_bar.tick();
    }

    pub fn set_message(&self, msg: &str) {
        self.progress_bar.set_message(msg.to_string());
    }

    pub fn finish_success(&self) {
        self.progress_bar.finish_with_message("Build completed ✓");
    }

    pub fn finish_error(&self, error: &str) {
        self.progress_bar
            .finish_with_message(format!("Build failed: {}", error));
    }
}
