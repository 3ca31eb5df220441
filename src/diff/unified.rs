// Copyright (c) 2025 - Cowboy AI, Inc.
//! Unified diff rendering
//!
//! Minimal line diff (Myers, linear space) rendered in the GNU unified
//! format.

use std::fmt::Write;

/// Header used for the side of a diff that does not exist
pub const DEV_NULL: &str = "/dev/null";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

impl Op {
    fn is_change(&self) -> bool {
        !matches!(self, Op::Equal(..))
    }

    fn old_lines(&self) -> usize {
        match self {
            Op::Equal(..) | Op::Delete(_) => 1,
            Op::Insert(_) => 0,
        }
    }

    fn new_lines(&self) -> usize {
        match self {
            Op::Equal(..) | Op::Insert(_) => 1,
            Op::Delete(_) => 0,
        }
    }
}

/// Edits searched per middle snake before giving up on minimality
const COST_BUDGET: isize = 4096;

fn diff_ops(old: &[&str], new: &[&str]) -> Vec<Op> {
    diff_ops_within(old, new, COST_BUDGET)
}

fn diff_ops_within(old: &[&str], new: &[&str], budget: isize) -> Vec<Op> {
    let myers = Myers { old, new, budget };
    let mut ops = Vec::with_capacity(old.len().max(new.len()));
    myers.conquer(0, old.len(), 0, new.len(), &mut ops);
    deletions_first(ops)
}

/// Within each run of changes, deleted lines come before inserted ones
fn deletions_first(ops: Vec<Op>) -> Vec<Op> {
    let mut ordered = Vec::with_capacity(ops.len());
    let mut inserts = Vec::new();
    for op in ops {
        match op {
            Op::Insert(_) => inserts.push(op),
            Op::Delete(_) => ordered.push(op),
            Op::Equal(..) => {
                ordered.append(&mut inserts);
                ordered.push(op);
            }
        }
    }
    ordered.append(&mut inserts);
    ordered
}

/// Myers' O(ND) line diff with the linear-space divide step
///
/// Each box is split at a point of its middle snake and both halves are
/// solved recursively. A box whose snake is not found within `budget`
/// edits is emitted as a plain delete and insert, which is valid but may
/// not be minimal.
struct Myers<'a, 'b> {
    old: &'a [&'b str],
    new: &'a [&'b str],
    budget: isize,
}

impl Myers<'_, '_> {
    fn conquer(
        &self,
        mut a0: usize,
        mut a1: usize,
        mut b0: usize,
        mut b1: usize,
        ops: &mut Vec<Op>,
    ) {
        while a0 < a1 && b0 < b1 && self.old[a0] == self.new[b0] {
            ops.push(Op::Equal(a0, b0));
            a0 += 1;
            b0 += 1;
        }
        let mut suffix = 0;
        while a0 < a1 && b0 < b1 && self.old[a1 - 1] == self.new[b1 - 1] {
            a1 -= 1;
            b1 -= 1;
            suffix += 1;
        }

        if a0 == a1 {
            ops.extend((b0..b1).map(Op::Insert));
        } else if b0 == b1 {
            ops.extend((a0..a1).map(Op::Delete));
        } else {
            match self.split(a0, a1, b0, b1) {
                Some((x, y)) => {
                    self.conquer(a0, x, b0, y, ops);
                    self.conquer(x, a1, y, b1, ops);
                }
                None => {
                    ops.extend((a0..a1).map(Op::Delete));
                    ops.extend((b0..b1).map(Op::Insert));
                }
            }
        }

        ops.extend((0..suffix).map(|i| Op::Equal(a1 + i, b1 + i)));
    }

    /// Split point strictly inside the box, if one was found
    fn split(&self, a0: usize, a1: usize, b0: usize, b1: usize) -> Option<(usize, usize)> {
        let (n, m) = ((a1 - a0) as isize, (b1 - b0) as isize);
        let (x, y) = self.middle_snake(a0, b0, n, m)?;
        let inside = (0..=n).contains(&x)
            && (0..=m).contains(&y)
            && (x, y) != (0, 0)
            && (x, y) != (n, m);
        inside.then(|| (a0 + x as usize, b0 + y as usize))
    }

    /// Box-relative point where the forward and backward searches meet
    ///
    /// `forward[at(k)]` is the furthest `x` reached on diagonal `k` from the
    /// top-left corner, `backward[at(k)]` the same from the bottom-right.
    fn middle_snake(&self, a0: usize, b0: usize, n: isize, m: isize) -> Option<(isize, isize)> {
        let max_d = (n + m + 1) / 2;
        let offset = max_d + 1;
        let at = |k: isize| (offset + k) as usize;
        let mut forward = vec![-1_isize; (2 * max_d + 3) as usize];
        let mut backward = forward.clone();
        forward[at(1)] = 0;
        backward[at(1)] = 0;

        let delta = n - m;
        let odd = delta % 2 != 0;
        let (mut f_low, mut f_high, mut b_low, mut b_high) = (0, 0, 0, 0);

        for d in 0..=max_d.min(self.budget) {
            let mut k = -d + f_low;
            while k <= d - f_high {
                let mut x = if k == -d || (k != d && forward[at(k - 1)] < forward[at(k + 1)]) {
                    forward[at(k + 1)]
                } else {
                    forward[at(k - 1)] + 1
                };
                let mut y = x - k;
                while x < n && y < m && self.old[a0 + x as usize] == self.new[b0 + y as usize] {
                    x += 1;
                    y += 1;
                }
                forward[at(k)] = x;
                if x > n {
                    f_high += 2;
                } else if y > m {
                    f_low += 2;
                } else if odd {
                    let kb = delta - k;
                    if (-max_d..=max_d).contains(&kb)
                        && backward[at(kb)] != -1
                        && x >= n - backward[at(kb)]
                    {
                        return Some((x, y));
                    }
                }
                k += 2;
            }

            let mut k = -d + b_low;
            while k <= d - b_high {
                let mut x = if k == -d || (k != d && backward[at(k - 1)] < backward[at(k + 1)]) {
                    backward[at(k + 1)]
                } else {
                    backward[at(k - 1)] + 1
                };
                let mut y = x - k;
                while x < n
                    && y < m
                    && self.old[a0 + (n - 1 - x) as usize] == self.new[b0 + (m - 1 - y) as usize]
                {
                    x += 1;
                    y += 1;
                }
                backward[at(k)] = x;
                if x > n {
                    b_high += 2;
                } else if y > m {
                    b_low += 2;
                } else if !odd {
                    let kf = delta - k;
                    if (-max_d..=max_d).contains(&kf) && forward[at(kf)] != -1 {
                        let xf = forward[at(kf)];
                        if xf >= n - x {
                            return Some((xf, xf - kf));
                        }
                    }
                }
                k += 2;
            }
        }

        None
    }
}

fn hunk_range(start: usize, count: usize) -> String {
    // empty ranges point at the line before the hunk
    let start = if count == 0 { start } else { start + 1 };
    if count == 1 {
        start.to_string()
    } else {
        format!("{},{}", start, count)
    }
}

/// Render a unified diff of two line sequences
///
/// Returns an empty string when the sequences are identical.
pub fn unified_diff(
    old: &[&str],
    new: &[&str],
    old_name: &str,
    new_name: &str,
    context: usize,
) -> String {
    let ops = diff_ops(old, new);

    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for (k, _) in ops.iter().enumerate().filter(|(_, op)| op.is_change()) {
        let start = k.saturating_sub(context);
        let end = (k + context + 1).min(ops.len());
        match hunks.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => hunks.push((start, end)),
        }
    }
    if hunks.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- {}", old_name);
    let _ = writeln!(out, "+++ {}", new_name);

    let (mut old_pos, mut new_pos, mut cursor) = (0, 0, 0);
    for (start, end) in hunks {
        for op in &ops[cursor..start] {
            old_pos += op.old_lines();
            new_pos += op.new_lines();
        }
        let hunk = &ops[start..end];
        let old_count: usize = hunk.iter().map(Op::old_lines).sum();
        let new_count: usize = hunk.iter().map(Op::new_lines).sum();

        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            hunk_range(old_pos, old_count),
            hunk_range(new_pos, new_count)
        );
        for op in hunk {
            let _ = match *op {
                Op::Equal(i, _) => writeln!(out, " {}", old[i]),
                Op::Delete(i) => writeln!(out, "-{}", old[i]),
                Op::Insert(j) => writeln!(out, "+{}", new[j]),
            };
        }

        old_pos += old_count;
        new_pos += new_count;
        cursor = end;
    }
    out
}

/// Trimmed text split into lines; blank text has no lines
pub fn text_lines(text: &str) -> Vec<&str> {
    text.trim().lines().collect()
}
