//! Native function ABI and the built-in natives the genotype engine
//! depends on.
//!
//! A native receives the VM and the number of labelled arguments the
//! `NATIVE` opcode left on the operand stack, reads the labels it knows,
//! ignores the rest, and returns a single result value. It may use the
//! PRNG, the heap (read-only), the matrix stack and the render data, but
//! must leave `sp`, `fp` and `ip` untouched; the interpreter pops the
//! argument pairs and pushes the result itself.
//!
//! Drawing natives are host concerns and are registered through
//! `Engine::register_native`.

use log::warn;

use crate::error::{Error, Result};
use crate::keywords::{Keyword, Native};
use crate::var::{Colour, ColourFormat, Var};
use crate::vm::Vm;

pub type NativeFn = fn(&mut Vm, i32) -> Result<Var>;

pub fn native_fn(native: Native) -> NativeFn {
    match native {
        Native::GenInt => gen_int,
        Native::GenScalar => gen_scalar,
        Native::Gen2d => gen_2d,
        Native::GenSelect => gen_select,
        Native::GenCol => gen_col,
        Native::GenStray => gen_stray,
        Native::GenStrayInt => gen_stray_int,
        Native::GenStray2d => gen_stray_vector,
        Native::GenStray3d => gen_stray_vector,
        Native::GenStray4d => gen_stray_vector,
        Native::ColRgb => col_rgb,
        Native::ColHsl => col_hsl,
        Native::ColHsluv => col_hsluv,
        Native::ColHsv => col_hsv,
        Native::ColLab => col_lab,
        Native::ColXyz => col_xyz,
    }
}

fn labelled_f32(pairs: &[(i32, Var)], label: Keyword, default: f32) -> Result<f32> {
    for (iname, var) in pairs {
        if *iname == i32::from(label) {
            return var.as_f32();
        }
    }
    Ok(default)
}

fn labelled_var(pairs: &[(i32, Var)], label: Keyword) -> Option<Var> {
    pairs
        .iter()
        .find(|(iname, _)| *iname == i32::from(label))
        .map(|(_, var)| *var)
}

/// Reads up to four float components out of a 2d pair or a heap vector.
fn labelled_components(
    vm: &Vm,
    pairs: &[(i32, Var)],
    label: Keyword,
    out: &mut [f32],
) -> Result<()> {
    let Some(var) = labelled_var(pairs, label) else {
        return Ok(());
    };
    match var {
        Var::V2(a, b) => {
            if !out.is_empty() {
                out[0] = a;
            }
            if out.len() > 1 {
                out[1] = b;
            }
            Ok(())
        }
        Var::Vector(head) => {
            for (slot, element) in out.iter_mut().zip(vm.heap.chain_iter(head)) {
                *slot = element.as_f32()?;
            }
            Ok(())
        }
        _ => Err(Error::InvalidStackValue("a vector argument")),
    }
}

// ---------------------------------------------------------------
// gen/* — only meaningful inside trait programs, where the VM's PRNG
// state has been seeded by the genotype builder
// ---------------------------------------------------------------

// (gen/int min: 1 max: 100) — inclusive of both bounds. The value stays a
// float: scripts never produce true integers at runtime.
fn gen_int(vm: &mut Vm, num_args: i32) -> Result<Var> {
    let pairs = vm.native_arg_pairs(num_args)?;
    let min = labelled_f32(&pairs, Keyword::Min, 0.0)?;
    let max = labelled_f32(&pairs, Keyword::Max, 1000.0)?;

    let value = vm.prng_state.f32_range(min, max + 1.0);
    Ok(Var::Float(value.floor()))
}

// (gen/scalar min: 0 max: 1)
fn gen_scalar(vm: &mut Vm, num_args: i32) -> Result<Var> {
    let pairs = vm.native_arg_pairs(num_args)?;
    let min = labelled_f32(&pairs, Keyword::Min, 0.0)?;
    let max = labelled_f32(&pairs, Keyword::Max, 1.0)?;

    Ok(Var::Float(vm.prng_state.f32_range(min, max)))
}

// (gen/2d min: 0 max: 1)
fn gen_2d(vm: &mut Vm, num_args: i32) -> Result<Var> {
    let pairs = vm.native_arg_pairs(num_args)?;
    let min = labelled_f32(&pairs, Keyword::Min, 0.0)?;
    let max = labelled_f32(&pairs, Keyword::Max, 1.0)?;

    let x = vm.prng_state.f32_range(min, max);
    let y = vm.prng_state.f32_range(min, max);
    Ok(Var::V2(x, y))
}

// (gen/select from: '(a b c)) — 'from' is a quoted list so a two-element
// selection pool is not mistaken for a 2d point
fn gen_select(vm: &mut Vm, num_args: i32) -> Result<Var> {
    let pairs = vm.native_arg_pairs(num_args)?;
    let from = labelled_var(&pairs, Keyword::From)
        .ok_or(Error::InvalidStackValue("a 'from' list for gen/select"))?;

    match from {
        Var::Vector(head) => {
            let length = vm.heap.chain_length(head);
            if length == 0 {
                return Err(Error::InvalidStackValue("a non-empty 'from' list"));
            }
            let index = vm.prng_state.i32_range(0, length - 1);
            vm.heap
                .chain_nth(head, index)
                .copied()
                .ok_or(Error::InvalidStackValue("a readable 'from' list"))
        }
        _ => Err(Error::InvalidStackValue("a 'from' list for gen/select")),
    }
}

// (gen/col alpha: 1) — a random rgb colour; alpha is random too unless
// given
fn gen_col(vm: &mut Vm, num_args: i32) -> Result<Var> {
    let pairs = vm.native_arg_pairs(num_args)?;

    let r = vm.prng_state.next_f32();
    let g = vm.prng_state.next_f32();
    let b = vm.prng_state.next_f32();
    let alpha = match labelled_var(&pairs, Keyword::Alpha) {
        Some(var) => var.as_f32()?,
        None => vm.prng_state.next_f32(),
    };

    Ok(Var::Colour(Colour::rgb(r, g, b, alpha)))
}

// (gen/stray from: 10 by: 2) — a value within from ± by
fn gen_stray(vm: &mut Vm, num_args: i32) -> Result<Var> {
    let pairs = vm.native_arg_pairs(num_args)?;
    let from = labelled_f32(&pairs, Keyword::From, 1.0)?;
    let by = labelled_f32(&pairs, Keyword::By, 0.2)?.abs();

    Ok(Var::Float(vm.prng_state.f32_range(from - by, from + by)))
}

// like gen/stray but floored; the result is still a float
fn gen_stray_int(vm: &mut Vm, num_args: i32) -> Result<Var> {
    let pairs = vm.native_arg_pairs(num_args)?;
    let from = labelled_f32(&pairs, Keyword::From, 0.0)?;
    let by = labelled_f32(&pairs, Keyword::By, 1.0)?.abs();

    let value = vm.prng_state.f32_range(from - by, from + by);
    Ok(Var::Float(value.floor()))
}

// (gen/stray-2d from: [10 10] by: [1 1]) and the 3d/4d variants: the
// genotype builder runs this once per vector component, with the
// component index carried on the VM
fn gen_stray_vector(vm: &mut Vm, num_args: i32) -> Result<Var> {
    if !vm.building_with_trait_within_vector {
        warn!("gen/stray-2d family called outside a within-vector trait");
    }

    let pairs = vm.native_arg_pairs(num_args)?;

    let mut from = [10.0f32; 4];
    let mut by = [1.0f32; 4];
    labelled_components(vm, &pairs, Keyword::From, &mut from)?;
    labelled_components(vm, &pairs, Keyword::By, &mut by)?;

    let index = vm.trait_within_vector_index.clamp(0, 3) as usize;
    let spread = by[index].abs();
    let value = vm
        .prng_state
        .f32_range(from[index] - spread, from[index] + spread);
    Ok(Var::Float(value))
}

// ---------------------------------------------------------------
// col/* constructors
// ---------------------------------------------------------------

fn colour_from_labels(
    vm: &mut Vm,
    num_args: i32,
    format: ColourFormat,
    labels: [Keyword; 3],
) -> Result<Var> {
    let pairs = vm.native_arg_pairs(num_args)?;
    let e0 = labelled_f32(&pairs, labels[0], 0.0)?;
    let e1 = labelled_f32(&pairs, labels[1], 0.0)?;
    let e2 = labelled_f32(&pairs, labels[2], 0.0)?;
    let alpha = labelled_f32(&pairs, Keyword::Alpha, 1.0)?;

    Ok(Var::Colour(Colour::new(format, e0, e1, e2, alpha)))
}

// (col/rgb r: 1 g: 0 b: 0.4 alpha: 1)
fn col_rgb(vm: &mut Vm, num_args: i32) -> Result<Var> {
    colour_from_labels(
        vm,
        num_args,
        ColourFormat::Rgb,
        [Keyword::R, Keyword::G, Keyword::B],
    )
}

fn col_hsl(vm: &mut Vm, num_args: i32) -> Result<Var> {
    colour_from_labels(
        vm,
        num_args,
        ColourFormat::Hsl,
        [Keyword::H, Keyword::S, Keyword::L],
    )
}

fn col_hsluv(vm: &mut Vm, num_args: i32) -> Result<Var> {
    colour_from_labels(
        vm,
        num_args,
        ColourFormat::Hsluv,
        [Keyword::H, Keyword::S, Keyword::L],
    )
}

fn col_hsv(vm: &mut Vm, num_args: i32) -> Result<Var> {
    colour_from_labels(
        vm,
        num_args,
        ColourFormat::Hsv,
        [Keyword::H, Keyword::S, Keyword::V],
    )
}

fn col_lab(vm: &mut Vm, num_args: i32) -> Result<Var> {
    colour_from_labels(
        vm,
        num_args,
        ColourFormat::Lab,
        [Keyword::L, Keyword::A, Keyword::B],
    )
}

fn col_xyz(vm: &mut Vm, num_args: i32) -> Result<Var> {
    colour_from_labels(
        vm,
        num_args,
        ColourFormat::Xyz,
        [Keyword::X, Keyword::Y, Keyword::Z],
    )
}
