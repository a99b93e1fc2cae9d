//! 进度追踪.
//!
//! worker 在每个任务结束时 (无论成功与否) 发送一个 [`Done`];
//! 追踪线程只负责读取并打印剩余任务数, 从不向 worker 回写.

use crate::consts::DATE_FORMAT;
use chrono::Local;
use crossbeam_channel::{Receiver, Sender};
use std::io::{self, Write};

/// 完成信号.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Done;

/// 发送完成信号. 追踪线程已退出时静默忽略.
#[inline]
pub fn notify(tx: &Sender<Done>) {
    let _ = tx.send(Done);
}

/// 剩余任务计数器.
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    total: usize,
    remaining: usize,
    width: usize,
}

impl ProgressTracker {
    /// 共 `n_tasks` 个任务.
    pub fn new(n_tasks: usize) -> Self {
        Self {
            total: n_tasks,
            remaining: n_tasks,
            width: n_tasks.to_string().len(),
        }
    }

    /// 剩余任务数.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn status<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(
            w,
            "Remaining tasks: {:width$} / {}\r",
            self.remaining,
            self.total,
            width = self.width
        )?;
        w.flush()
    }

    /// 阻塞读取 `rx`, 每收到一个信号计数减一并刷新状态行.
    ///
    /// 计数归零, 或所有发送端都已关闭时返回.
    pub fn run<W: Write>(mut self, rx: &Receiver<Done>, mut w: W) -> io::Result<usize> {
        writeln!(w, "Start processing at {}", Local::now().format(DATE_FORMAT))?;
        self.status(&mut w)?;

        while self.remaining > 0 {
            if rx.recv().is_err() {
                break;
            }
            self.remaining -= 1;
            self.status(&mut w)?;
        }

        writeln!(w)?;
        if self.remaining == 0 {
            writeln!(w, "All done. Finished at {}", Local::now().format(DATE_FORMAT))?;
        }
        Ok(self.remaining)
    }
}
