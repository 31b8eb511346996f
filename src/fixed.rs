//! Fixed point numbers and a float generator fed by raw bytes.

/// Q7: one sign bit and seven fractional bits, covering [-1, 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Q7(pub i8);

impl From<f64> for Q7 {
    fn from(n: f64) -> Q7 {
        if n.is_nan() {
            Q7(0)
        } else if n >= 1.0 {
            Q7(127)
        } else if n < -1.0 {
            Q7(-128)
        } else {
            Q7((n * 128.0) as i8)
        }
    }
}

impl From<f32> for Q7 {
    fn from(n: f32) -> Q7 {
        Q7::from(n as f64)
    }
}

impl From<Q7> for f64 {
    fn from(n: Q7) -> f64 {
        (n.0 as f64) * 2f64.powi(-7)
    }
}

impl From<Q7> for f32 {
    fn from(n: Q7) -> f32 {
        f64::from(n) as f32
    }
}

/// Maps a byte onto [0, 1).
///
/// The byte becomes the top of the mantissa of a float in [0.5, 1), which is
/// then stretched back over the unit interval.
pub fn mock_rand(n: u8) -> f32 {
    let base: u32 = 0b0_01111110_00000000000000000000000;
    let large_n = (n as u32) << 15;
    let f32_bits = base | large_n;
    let m = f32::from_bits(f32_bits);
    2.0 * (m - 0.5)
}

#[test]
fn test_q7_out_of_bounds() {
    assert_eq!(Q7::from(10.0f64), Q7::from(1.0f64));
    assert_eq!(Q7::from(-10.0f64), Q7::from(-1.0f64));
    assert_eq!(Q7::from(f64::NAN), Q7(0));
}

#[test]
fn test_q7_from_float() {
    assert_eq!(Q7::from(0.7f32), Q7(89));
    assert_eq!(Q7::from(-0.5f64), Q7(-64));
    assert_eq!(Q7::from(-1.0f64), Q7(-128));
}

#[test]
fn test_q7_to_float() {
    assert_eq!(f64::from(Q7(64)), 0.5);
    assert_eq!(f32::from(Q7(-128)), -1.0);
    assert_eq!(f64::from(Q7(127)), 0.9921875);
}

#[test]
fn test_mock_rand() {
    assert_eq!(mock_rand(0), 0.0);
    assert_eq!(mock_rand(0xFF), 0.99609375);
    assert_eq!(mock_rand(0x7F), 0.49609375);

    let mut previous = -1.0;
    for n in 0..=255u8 {
        let r = mock_rand(n);
        assert!(r >= 0.0 && r < 1.0);
        assert!(r > previous);
        previous = r;
    }
}
