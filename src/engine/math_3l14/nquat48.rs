use std::fmt::{Binary, Debug, Formatter};
use bitcode::{Decode, Encode};
use glam::Quat;

// the three smallest components of a unit quaternion are within +/- 1/sqrt(2)
const MAX_SMALLEST: f32 = std::f32::consts::FRAC_1_SQRT_2;
const MAX_FIXED15: f32 = ((1 << 14) - 1) as f32;

#[inline] #[must_use]
fn to_fixed15(f: f32) -> u16
{
    let as_int = (f.clamp(-MAX_SMALLEST, MAX_SMALLEST) / MAX_SMALLEST * MAX_FIXED15).round() as i16;
    (as_int as u16) & 0x7fff
}

#[inline] #[must_use]
fn from_fixed15(i: u16) -> f32
{
    // sign-extend from 15 bits
    let i = ((i << 1) as i16) >> 1;
    i as f32 / MAX_FIXED15 * MAX_SMALLEST
}

// Store a normalized quaternion in 48 bits
// This loses precision but is generally sufficient for animations
// bits 0-14, 15-29, 30-44 are smaller three of x,y,z,w
// bits 45,46 are which component is missing
// bit 47 is the sign of the omitted value
#[derive(Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub struct NQuat48([u8; 6]);
impl NQuat48
{
    /// The identity rotation
    pub const IDENTITY: Self = Self([0, 0, 0, 0, 0, 0b0110_0000]);

    #[inline] #[must_use]
    fn bits(&self) -> u64
    {
        let mut bytes = [0u8; 8];
        bytes[..6].copy_from_slice(&self.0);
        u64::from_le_bytes(bytes)
    }

    #[inline] #[must_use]
    fn from_bits(bits: u64) -> Self
    {
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&bits.to_le_bytes()[..6]);
        Self(bytes)
    }

    #[inline] #[must_use]
    pub fn to_quat(self) -> Quat { self.into() }
}
impl Default for NQuat48
{
    fn default() -> Self { Self::IDENTITY }
}
impl From<Quat> for NQuat48
{
    fn from(value: Quat) -> Self
    {
        debug_assert!(value.is_normalized());

        let vals = value.to_array();
        let mut max = 0;
        for i in 1..vals.len()
        {
            if vals[i].abs() > vals[max].abs()
            {
                max = i;
            }
        }

        let mut bits = vals[max].is_sign_negative() as u64;
        bits = (bits << 2) | (max & 0b11) as u64;
        for i in 0..vals.len()
        {
            let n = 3 - i;
            if n == max { continue }
            bits = (bits << 15) | (to_fixed15(vals[n]) as u64);
        }

        Self::from_bits(bits)
    }
}
impl From<NQuat48> for Quat
{
    fn from(value: NQuat48) -> Self
    {
        let mut bits = value.bits();
        let max = ((bits >> 45) & 0b11) as usize;
        let negative = (bits >> 47) & 1 == 1;

        let mut vals = [0.0; 4];
        let mut sum_sq = 0.0;
        for i in 0..4
        {
            if i == max { continue }
            vals[i] = from_fixed15((bits & 0x7fff) as u16);
            sum_sq += vals[i] * vals[i];
            bits >>= 15;
        }

        vals[max] = (1.0 - sum_sq).max(0.0).sqrt();
        if negative { vals[max] = -vals[max]; }

        // quantization error can leave the result slightly off unit length
        Quat::from_array(vals).normalize()
    }
}
impl Debug for NQuat48
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        let mut bits = self.bits();
        let max = ((bits >> 45) & 0b11) as usize;
        f.write_fmt(format_args!("M:{}{}", max, if (bits >> 47) > 0 { "[-]" } else { "[+]" }))?;
        for i in 0..4
        {
            if i == max { continue }
            let val = from_fixed15((bits & 0x7fff) as u16);
            f.write_fmt(format_args!(" {}", val))?;
            bits >>= 15;
        }

        Ok(())
    }
}
impl Binary for NQuat48
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        let mut bits = self.bits().reverse_bits() >> (64 - 48);
        let mut str = String::with_capacity(48 + 4);
        for l in [1, 2, 15, 15, 15]
        {
            if !str.is_empty() { str.push(' '); }
            for _i in 0..l
            {
                str.push(if (bits & 1) == 1 { '1' } else { '0' });
                bits >>= 1;
            }
        }

        f.write_str(&str)
    }
}
