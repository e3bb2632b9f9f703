/// Setup Parameter Types.
///
/// Even keys carry varints, odd keys carry opaque bytes, same as every
/// other parameter map.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u64)]
pub enum ParameterType {
    Role = 0x0,
    Path = 0x1,
    MaxRequestId = 0x2,
    AuthorizationToken = 0x3,
    MaxAuthTokenCacheSize = 0x4,
    Authority = 0x5,
    MoqtImplementation = 0x7,
    EndpointId = 0xf01,
}

impl From<ParameterType> for u64 {
    fn from(value: ParameterType) -> Self {
        value as u64
    }
}
