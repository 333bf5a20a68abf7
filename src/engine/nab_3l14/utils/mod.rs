use std::fmt::{Display, Formatter};

pub struct FormatBinary
{
    pub bytes: f64
}
#[allow(non_upper_case_globals)]
impl FormatBinary
{
    pub const Ki: f64 = 1.0 * 1024.0; // Kibi (Ki)
    pub const Mi: f64 = Self::Ki * 1024.0; // Mebi (Mi)
    pub const Gi: f64 = Self::Mi * 1024.0; // Gibi (Gi)
}
impl Display for FormatBinary
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        let div =
        {
            if self.bytes > Self::Gi
            {
                (self.bytes / Self::Gi, "Gi")
            }
            else if self.bytes > Self::Mi
            {
                (self.bytes / Self::Mi, "Mi")
            }
            else if self.bytes > Self::Ki
            {
                (self.bytes / Self::Ki, "Ki")
            }
            else
            {
                (self.bytes, "")
            }
        };
        Display::fmt(&div.0, f)?;
        if f.alternate() { f.write_str(" ")?; }
        f.write_str(div.1)
    }
}
#[macro_export]
macro_rules! format_binary
{
    ($val:expr) => { $crate::utils::FormatBinary { bytes: $val as f64 } };
}

pub trait ShortTypeName
{
    fn short_type_name() -> &'static str;
}
impl<T> ShortTypeName for T
{
    // strips the module path, but not generic args
    #[inline]
    fn short_type_name() -> &'static str
    {
        let type_name = std::any::type_name::<T>();
        let path_end = type_name.find('<').unwrap_or(type_name.len());
        match type_name[..path_end].rfind(':')
        {
            None => type_name,
            Some(i) => &type_name[(i + 1)..]
        }
    }
}
