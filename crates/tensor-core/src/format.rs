// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Textual rendering of tensors.
//!
//! The layout is a compatibility contract locked down by golden-output
//! tests:
//!
//! ```text
//! Tensor
//!   dtype: float32          ┐
//!   rank: 2                 │ verbose only
//!   shape: [2,2]            │
//!   values:                 ┘
//!     [[1.11 , 2.11 ],
//!      [33.11, 44.11]]
//! ```
//!
//! Each column is right-padded to its widest entry. Numbers are rounded to
//! 7 fraction digits and printed in shortest form; strings are quoted,
//! booleans are `true`/`false`, and complex values are `re + imj`. A
//! dimension longer than 20 shows its first and last 3 entries around
//! `...`.

use crate::TensorData;

const FORMAT_LIMIT_NUM_VALS: usize = 20;
const FORMAT_NUM_FIRST_LAST_VALS: usize = 3;
const FORMAT_NUM_SIG_DIGITS: usize = 7;

/// One printable element; complex pairs are already grouped.
#[derive(Debug, Clone, Copy)]
enum Elem<'a> {
    Num(f64),
    Bool(bool),
    Str(&'a str),
    Complex(f64, f64),
}

/// Renders `data` laid out as `shape`.
pub fn tensor_to_string(data: &TensorData, shape: &[usize], verbose: bool) -> String {
    let elems = elements(data);
    let pad_per_col = max_size_per_column(&elems, shape);
    let vals_lines = sub_tensor_to_string(&elems, shape, &pad_per_col, true);

    let mut lines = vec!["Tensor".to_string()];
    if verbose {
        let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
        lines.push(format!("  dtype: {}", data.dtype()));
        lines.push(format!("  rank: {}", shape.len()));
        lines.push(format!("  shape: [{}]", dims.join(",")));
        lines.push("  values:".to_string());
    }
    lines.push(
        vals_lines
            .iter()
            .map(|l| format!("    {l}"))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    lines.join("\n")
}

fn elements(data: &TensorData) -> Vec<Elem<'_>> {
    match data {
        TensorData::Float32(v) => v.iter().map(|&x| Elem::Num(x as f64)).collect(),
        TensorData::Int32(v) => v.iter().map(|&x| Elem::Num(x as f64)).collect(),
        TensorData::Bool(v) => v.iter().map(|&b| Elem::Bool(b != 0)).collect(),
        TensorData::String(v) => v.iter().map(|s| Elem::Str(s.as_str())).collect(),
        TensorData::Complex64(v) => v
            .chunks_exact(2)
            .map(|c| Elem::Complex(c[0] as f64, c[1] as f64))
            .collect(),
    }
}

fn max_size_per_column(elems: &[Elem<'_>], shape: &[usize]) -> Vec<usize> {
    if shape.len() < 2 {
        return Vec::new();
    }
    let num_cols = shape[shape.len() - 1];
    let mut pad = vec![0usize; num_cols];
    if num_cols == 0 {
        return pad;
    }
    for row in elems.chunks(num_cols) {
        for (j, e) in row.iter().enumerate() {
            pad[j] = pad[j].max(val_to_string(*e, 0).chars().count());
        }
    }
    pad
}

fn val_to_string(elem: Elem<'_>, pad: usize) -> String {
    let s = match elem {
        Elem::Complex(re, im) => format!("{} + {}j", fixed(re), fixed(im)),
        Elem::Str(s) => format!("'{s}'"),
        Elem::Bool(b) => b.to_string(),
        Elem::Num(x) => fixed(x),
    };
    right_pad(s, pad)
}

fn right_pad(s: String, size: usize) -> String {
    let len = s.chars().count();
    if size <= len {
        return s;
    }
    format!("{s}{}", " ".repeat(size - len))
}

fn sub_tensor_to_string(
    elems: &[Elem<'_>],
    shape: &[usize],
    pad_per_col: &[usize],
    is_last: bool,
) -> Vec<String> {
    let rank = shape.len();
    let pad_at = |i: usize| pad_per_col.get(i).copied().unwrap_or(0);

    if rank == 0 {
        return vec![match elems.first() {
            Some(Elem::Num(x)) => js_number(*x),
            Some(Elem::Str(s)) => (*s).to_string(),
            Some(e) => val_to_string(*e, 0),
            None => String::new(),
        }];
    }

    let size = shape[0];
    if rank == 1 {
        let render = |offset: usize, vals: &[Elem<'_>]| {
            vals.iter()
                .enumerate()
                .map(|(i, e)| val_to_string(*e, pad_at(offset + i)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        if size > FORMAT_LIMIT_NUM_VALS {
            let tail = size - FORMAT_NUM_FIRST_LAST_VALS;
            return vec![format!(
                "[{}, ..., {}]",
                render(0, &elems[..FORMAT_NUM_FIRST_LAST_VALS]),
                render(tail, &elems[tail..size]),
            )];
        }
        return vec![format!("[{}]", render(0, &elems[..size]))];
    }

    let sub_shape = &shape[1..];
    let stride: usize = sub_shape.iter().product();
    let row = |i: usize, last: bool| {
        sub_tensor_to_string(&elems[i * stride..(i + 1) * stride], sub_shape, pad_per_col, last)
    };

    let mut lines: Vec<String> = Vec::new();
    if size > FORMAT_LIMIT_NUM_VALS {
        for i in 0..FORMAT_NUM_FIRST_LAST_VALS {
            lines.extend(row(i, false));
        }
        lines.push("...".to_string());
        for i in size - FORMAT_NUM_FIRST_LAST_VALS..size {
            lines.extend(row(i, i == size - 1));
        }
    } else {
        for i in 0..size {
            lines.extend(row(i, i == size - 1));
        }
    }

    let sep = if rank == 2 { "," } else { "" };
    if lines.is_empty() {
        lines.push("[".to_string());
    } else {
        lines[0] = format!("[{}{sep}", lines[0]);
    }
    let n = lines.len();
    for line in lines.iter_mut().take(n - 1).skip(1) {
        *line = format!(" {line}{sep}");
    }
    let new_line_sep = format!(",\n{}", "\n".repeat(rank - 2));
    let last = &mut lines[n - 1];
    *last = format!(" {last}]{}", if is_last { "" } else { new_line_sep.as_str() });
    lines
}

/// Rounds to 7 fraction digits, then prints the shortest form.
fn fixed(x: f64) -> String {
    if !x.is_finite() || x.abs() >= 1e21 {
        return js_number(x);
    }
    let rounded: f64 = to_fixed(x, FORMAT_NUM_SIG_DIGITS).parse().unwrap_or(x);
    js_number(rounded)
}

/// Decimal rendering with `digits` fraction digits. Exact ties round away
/// from zero, unlike `format!("{x:.7}")` which rounds them to even.
fn to_fixed(x: f64, digits: usize) -> String {
    // Every finite f64 has at most 1074 fraction digits, so this expansion
    // is exact and the first dropped digit decides the rounding.
    let exact = format!("{:.1100}", x.abs());
    let (int_part, frac) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let frac = frac.as_bytes();

    let mut kept: Vec<u8> = int_part.bytes().collect();
    kept.extend((0..digits).map(|i| frac.get(i).copied().unwrap_or(b'0')));
    if frac.get(digits).is_some_and(|&d| d >= b'5') {
        let mut i = kept.len();
        loop {
            if i == 0 {
                kept.insert(0, b'1');
                break;
            }
            i -= 1;
            if kept[i] == b'9' {
                kept[i] = b'0';
            } else {
                kept[i] += 1;
                break;
            }
        }
    }

    let split = kept.len() - digits;
    let (int_digits, frac_digits) = kept.split_at(split);
    let sign = if x.is_sign_negative() { "-" } else { "" };
    format!(
        "{sign}{}.{}",
        String::from_utf8_lossy(int_digits),
        String::from_utf8_lossy(frac_digits)
    )
}

/// Shortest round-trip rendering with JavaScript's `Number#toString`
/// conventions: `NaN`, `Infinity`, `0` for both zeros, and exponent form
/// outside `[1e-6, 1e21)`.
fn js_number(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if x == 0.0 {
        return "0".to_string();
    }
    let abs = x.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{x}");
    }
    let s = format!("{x:e}");
    match s.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32s(v: &[f32]) -> TensorData {
        TensorData::Float32(v.to_vec())
    }

    #[test]
    fn test_scalar_verbose() {
        assert_eq!(
            tensor_to_string(&f32s(&[5.0]), &[], true),
            "Tensor\n  dtype: float32\n  rank: 0\n  shape: []\n  values:\n    5"
        );
    }

    #[test]
    fn test_scalar_plain() {
        assert_eq!(tensor_to_string(&f32s(&[5.0]), &[], false), "Tensor\n    5");
        assert_eq!(
            tensor_to_string(&TensorData::String(vec!["hi".into()]), &[], false),
            "Tensor\n    hi"
        );
    }

    #[test]
    fn test_1d() {
        assert_eq!(
            tensor_to_string(&f32s(&[1.0, 2.0, 3.0]), &[3], false),
            "Tensor\n    [1, 2, 3]"
        );
    }

    #[test]
    fn test_1d_verbose_shape_has_no_spaces() {
        let out = tensor_to_string(&TensorData::Int32(vec![1, 2, 3, 4, 5, 6]), &[2, 3], true);
        assert!(out.contains("  dtype: int32\n  rank: 2\n  shape: [2,3]\n"));
    }

    #[test]
    fn test_1d_truncates_long() {
        let v: Vec<f32> = (0..25).map(|i| i as f32).collect();
        assert_eq!(
            tensor_to_string(&f32s(&v), &[25], false),
            "Tensor\n    [0, 1, 2, ..., 22, 23, 24]"
        );
    }

    #[test]
    fn test_2d_column_padding() {
        let out = tensor_to_string(&f32s(&[1.11, 2.11, 33.11, 44.11]), &[2, 2], false);
        assert_eq!(out, "Tensor\n    [[1.11 , 2.11 ],\n     [33.11, 44.11]]");
    }

    #[test]
    fn test_3d_blank_line_between_blocks() {
        let v: Vec<f32> = (1..=8).map(|i| i as f32).collect();
        let out = tensor_to_string(&f32s(&v), &[2, 2, 2], false);
        assert_eq!(
            out,
            "Tensor\n    [[[1, 2],\n      [3, 4]],\n\n     [[5, 6],\n      [7, 8]]]"
        );
    }

    #[test]
    fn test_2d_row_elision() {
        let v: Vec<i32> = (0..50).collect();
        let out = tensor_to_string(&TensorData::Int32(v), &[25, 2], false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "    [[0 , 1 ],");
        assert_eq!(lines[4], "     ...,");
        assert_eq!(lines[7], "     [48, 49]]");
    }

    #[test]
    fn test_strings_quoted_and_padded() {
        let data = TensorData::String(vec!["a".into(), "bb".into(), "ccc".into(), "d".into()]);
        let out = tensor_to_string(&data, &[2, 2], false);
        assert_eq!(out, "Tensor\n    [['a'  , 'bb'],\n     ['ccc', 'd' ]]");
    }

    #[test]
    fn test_bool() {
        let out = tensor_to_string(&TensorData::Bool(vec![1, 0, 1]), &[3], false);
        assert_eq!(out, "Tensor\n    [true, false, true]");
        let out = tensor_to_string(&TensorData::Bool(vec![0]), &[], false);
        assert_eq!(out, "Tensor\n    false");
    }

    #[test]
    fn test_complex() {
        let out = tensor_to_string(&TensorData::Complex64(vec![1.0, 2.0, -3.5, 4.0]), &[2], false);
        assert_eq!(out, "Tensor\n    [1 + 2j, -3.5 + 4j]");
        let out = tensor_to_string(&TensorData::Complex64(vec![1.0, 2.0]), &[], true);
        assert!(out.ends_with("values:\n    1 + 2j"));
    }

    #[test]
    fn test_number_rounding() {
        assert_eq!(fixed(0.1f32 as f64), "0.1");
        assert_eq!(fixed(1.0 / 3.0), "0.3333333");
        assert_eq!(fixed(-0.0), "0");
        assert_eq!(js_number(0.1f32 as f64), "0.10000000149011612");
        assert_eq!(js_number(1e-7), "1e-7");
        assert_eq!(js_number(1e21), "1e+21");
        assert_eq!(js_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_ties_round_away_from_zero() {
        assert_eq!(to_fixed(0.00390625, 7), "0.0039063");
        assert_eq!(to_fixed(-0.00390625, 7), "-0.0039063");
        assert_eq!(to_fixed(0.99609375, 2), "1.00");
        assert_eq!(to_fixed(9.5, 0), "10.");
        assert_eq!(fixed(0.50390625), "0.5039063");
        assert_eq!(
            tensor_to_string(&f32s(&[0.00390625, 0.50390625]), &[2], false),
            "Tensor\n    [0.0039063, 0.5039063]"
        );
    }
}
