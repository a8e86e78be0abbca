// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use indicatif::{ProgressBar, ProgressStyle};
use crate::sender::ProgressObserver;

/// Upload progress bar
pub struct TransferProgress {
    bar: ProgressBar,
}

impl TransferProgress {
    pub fn new(total_bytes: u64) -> Self {
        Self::with_bar(ProgressBar::new(total_bytes))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        TransferProgress { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }

    /// Leave the bar where it stopped
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl ProgressObserver for TransferProgress {
    fn on_progress(&mut self, bytes_sent: u64, total_size: u64) {
        self.bar.set_length(total_size);
        self.bar.set_position(bytes_sent);
    }
}
