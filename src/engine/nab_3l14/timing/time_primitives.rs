use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::time::Duration;
use bitcode::{Decode, Encode};

macro_rules! generate_time_primitive
{
    ($name:ident, $type:ty) =>
    {
        #[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Encode, Decode)]
        pub struct $name(pub $type);
        impl $name
        {
            pub const ZERO: Self = Self(0.0);
        }
        impl Ord for $name
        {
            // NaNs sort last
            fn cmp(&self, other: &Self) -> Ordering { self.0.total_cmp(&other.0) }
        }
        impl Eq for $name { }
        impl Add for $name
        {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output { Self(self.0 + rhs.0) }
        }
        impl AddAssign for $name
        {
            fn add_assign(&mut self, rhs: Self) { self.0 += rhs.0; }
        }
        impl Sub for $name
        {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output { Self(self.0 - rhs.0) }
        }
        impl SubAssign for $name
        {
            fn sub_assign(&mut self, rhs: Self) { self.0 -= rhs.0; }
        }
        impl Neg for $name
        {
            type Output = Self;
            fn neg(self) -> Self::Output { Self(-self.0) }
        }
        impl Mul<$type> for $name
        {
            type Output = Self;
            fn mul(self, rhs: $type) -> Self::Output { Self(self.0 * rhs) }
        }
        impl Div for $name
        {
            type Output = $type;
            fn div(self, rhs: Self) -> Self::Output { self.0 / rhs.0 }
        }
    };
}

generate_time_primitive!(FSeconds, f32);

impl From<Duration> for FSeconds { fn from(duration: Duration) -> Self { Self(duration.as_secs_f32()) } }
impl From<FSeconds> for Duration { fn from(sec: FSeconds) -> Self { Self::from_secs_f32(sec.0.max(0.0)) } }

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn arithmetic()
    {
        let mut t = FSeconds(1.5);
        t += FSeconds(0.5);
        assert_eq!(t, FSeconds(2.0));
        t -= FSeconds(3.0);
        assert_eq!(t, FSeconds(-1.0));
        assert_eq!(-t * 2.0, FSeconds(2.0));
        assert_eq!(FSeconds(3.0) / FSeconds(2.0), 1.5);
        assert_eq!(FSeconds::from(Duration::from_millis(500)), FSeconds(0.5));
        assert_eq!(Duration::from(FSeconds(-1.0)), Duration::ZERO);
    }

    #[test]
    fn ordering()
    {
        let mut times = [FSeconds(2.0), FSeconds::ZERO, FSeconds(-1.0)];
        times.sort();
        assert_eq!(times, [FSeconds(-1.0), FSeconds::ZERO, FSeconds(2.0)]);
    }
}
