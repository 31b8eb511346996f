//! IEEE-754 deconstruction of floating point numbers.
//!
//! Bit layout of an `f32` (an `f64` is the same with an 11 bit exponent and
//! a 52 bit mantissa):
//!
//! ```text
//!  31 | 30 ........ 23 | 22 .................... 0
//! sign|    exponent    |         mantissa
//! ```
//!
//! The radix is 2 and the exponent is stored with a bias of 127 (1023 for
//! `f64`).

use colored::Colorize;
use num_traits::Float;
use std::fmt;

/// Floating point types whose bit pattern can be taken apart.
pub trait FloatBits: Float + fmt::Debug {
    const TOTAL_BITS: u32;
    const EXPONENT_BITS: u32;
    const MANTISSA_BITS: u32;
    const BIAS: i32;

    fn to_raw(self) -> u64;
    fn from_raw(bits: u64) -> Self;
    fn widen(self) -> f64;
}

impl FloatBits for f32 {
    const TOTAL_BITS: u32 = 32;
    const EXPONENT_BITS: u32 = 8;
    const MANTISSA_BITS: u32 = 23;
    const BIAS: i32 = 127;

    fn to_raw(self) -> u64 {
        self.to_bits() as u64
    }

    fn from_raw(bits: u64) -> f32 {
        f32::from_bits(bits as u32)
    }

    fn widen(self) -> f64 {
        self as f64
    }
}

impl FloatBits for f64 {
    const TOTAL_BITS: u32 = 64;
    const EXPONENT_BITS: u32 = 11;
    const MANTISSA_BITS: u32 = 52;
    const BIAS: i32 = 1023;

    fn to_raw(self) -> u64 {
        self.to_bits()
    }

    fn from_raw(bits: u64) -> f64 {
        f64::from_bits(bits)
    }

    fn widen(self) -> f64 {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatKind {
    Zero,
    Subnormal,
    Normal,
    Infinite,
    NaN,
}

impl fmt::Display for FloatKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            FloatKind::Zero => "zero",
            FloatKind::Subnormal => "subnormal",
            FloatKind::Normal => "normal",
            FloatKind::Infinite => "infinite",
            FloatKind::NaN => "NaN",
        };
        f.write_str(name)
    }
}

/// A float split into its three raw bit fields.
#[derive(Debug, Clone, Copy)]
pub struct DeconstructedFloat<T: FloatBits> {
    value: T,
    sign_bit: u8,
    // biased, as stored
    exponent_bits: u32,
    // fraction only, the implicit leading bit is not included
    mantissa_bits: u64,
}

fn exponent_mask<T: FloatBits>() -> u32 {
    (1u32 << T::EXPONENT_BITS) - 1
}

fn mantissa_mask<T: FloatBits>() -> u64 {
    (1u64 << T::MANTISSA_BITS) - 1
}

/// Exact power of two, valid for every exponent a normal `f64` can carry.
fn pow2(exponent: i32) -> f64 {
    debug_assert!((-1022..=1023).contains(&exponent));
    f64::from_bits(((exponent + 1023) as u64) << 52)
}

impl<T: FloatBits> DeconstructedFloat<T> {
    pub fn new(value: T) -> DeconstructedFloat<T> {
        let bits = value.to_raw();

        let sign_bit = ((bits >> (T::TOTAL_BITS - 1)) & 1) as u8;
        let exponent_bits = ((bits >> T::MANTISSA_BITS) as u32) & exponent_mask::<T>();
        let mantissa_bits = bits & mantissa_mask::<T>();

        DeconstructedFloat {
            value,
            sign_bit,
            exponent_bits,
            mantissa_bits,
        }
    }

    /// Builds a float from raw fields. Bits above each field's width are dropped.
    pub fn from_parts(sign_bit: u8, exponent_bits: u32, mantissa_bits: u64) -> DeconstructedFloat<T> {
        let bits = (((sign_bit & 1) as u64) << (T::TOTAL_BITS - 1))
            | (((exponent_bits & exponent_mask::<T>()) as u64) << T::MANTISSA_BITS)
            | (mantissa_bits & mantissa_mask::<T>());
        DeconstructedFloat::new(T::from_raw(bits))
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn sign_bit(&self) -> u8 {
        self.sign_bit
    }

    pub fn exponent_bits(&self) -> u32 {
        self.exponent_bits
    }

    pub fn mantissa_bits(&self) -> u64 {
        self.mantissa_bits
    }

    /// Reassembles the value from the stored fields.
    pub fn reconstruct(&self) -> T {
        DeconstructedFloat::<T>::from_parts(self.sign_bit, self.exponent_bits, self.mantissa_bits).value
    }

    pub fn kind(&self) -> FloatKind {
        let max_exponent = exponent_mask::<T>();
        match (self.exponent_bits, self.mantissa_bits) {
            (0, 0) => FloatKind::Zero,
            (0, _) => FloatKind::Subnormal,
            (e, 0) if e == max_exponent => FloatKind::Infinite,
            (e, _) if e == max_exponent => FloatKind::NaN,
            _ => FloatKind::Normal,
        }
    }

    pub fn sign(&self) -> f64 {
        if self.sign_bit == 0 {
            1.0
        } else {
            -1.0
        }
    }

    /// Unbiased exponent. Zero and subnormals share the smallest normal exponent.
    pub fn exponent(&self) -> Option<i32> {
        match self.kind() {
            FloatKind::Zero | FloatKind::Subnormal => Some(1 - T::BIAS),
            FloatKind::Normal => Some(self.exponent_bits as i32 - T::BIAS),
            FloatKind::Infinite | FloatKind::NaN => None,
        }
    }

    /// Significand including the implicit leading bit.
    pub fn mantissa(&self) -> Option<f64> {
        let fraction = self.mantissa_bits as f64 / pow2(T::MANTISSA_BITS as i32);
        match self.kind() {
            FloatKind::Zero | FloatKind::Subnormal => Some(fraction),
            FloatKind::Normal => Some(1.0 + fraction),
            FloatKind::Infinite | FloatKind::NaN => None,
        }
    }

    /// `sign * mantissa * 2^exponent`, computed from the fields alone.
    pub fn decoded_value(&self) -> f64 {
        match (self.exponent(), self.mantissa()) {
            (Some(exponent), Some(mantissa)) => self.sign() * mantissa * pow2(exponent),
            _ => self.value.widen(),
        }
    }

    pub fn integer_decode(&self) -> (u64, i16, i8) {
        self.value.integer_decode()
    }

    pub fn render(&self, colorize: bool) -> String {
        let total = T::TOTAL_BITS as usize;
        let exponent_end = 1 + T::EXPONENT_BITS as usize;
        let all_bits = format!("{:0width$b}", self.value.to_raw(), width = total);

        let highlight = |bits: &str| -> String {
            if colorize {
                bits.on_red().to_string()
            } else {
                bits.to_string()
            }
        };
        let zeros = |count: usize| "0".repeat(count);

        let mut out = String::new();
        out.push_str(&format!("\nInput: {:?}\n\n", self.value));
        out.push_str(&format!("| input (bits) | {} |\n", all_bits));
        out.push_str(&format!(
            "| sign         | {}{} |\n",
            highlight(&all_bits[..1]),
            zeros(total - 1)
        ));
        out.push_str(&format!(
            "| exponent     | {}{}{} |\n",
            zeros(1),
            highlight(&all_bits[1..exponent_end]),
            zeros(total - exponent_end)
        ));
        out.push_str(&format!(
            "| mantissa     | {}{} |\n",
            zeros(exponent_end),
            highlight(&all_bits[exponent_end..])
        ));
        out.push('\n');

        let describe = |part: Option<String>| part.unwrap_or_else(|| "n/a".to_string());
        out.push_str(&format!(
            "kind: {}, sign: {}, exponent: {}, mantissa: {}, value: {:?}\n",
            self.kind(),
            self.sign(),
            describe(self.exponent().map(|e| e.to_string())),
            describe(self.mantissa().map(|m| m.to_string())),
            self.decoded_value()
        ));
        let (integer, power, _) = self.integer_decode();
        out.push_str(&format!(
            "raw: sign {}, exponent {}, mantissa 0x{:x}, integer decode {} * 2^{}\n",
            self.sign_bit, self.exponent_bits, self.mantissa_bits, integer, power
        ));
        out
    }

    pub fn print(&self, colorize: bool) {
        print!("{}", self.render(colorize));
    }
}
