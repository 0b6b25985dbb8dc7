// ABOUTME: Defines SMPP v3.4 priority_flag field values per specification Section 5.2.14
// ABOUTME: Values above Level3 are reserved and rejected by the decoder

use num_enum::TryFromPrimitive;

/// SMPP v3.4 Priority Flag Field
///
/// The priority_flag parameter allows the originating SME to assign a priority
/// level to the short message. The gateway does not interpret it; it is handed
/// to the backend untouched as part of the submit options.
///
/// Priority levels 4-255 are reserved.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PriorityFlag {
    /// Level 0 - Lowest priority (default)
    #[default]
    Level0 = 0,

    /// Level 1 - Normal priority
    Level1 = 1,

    /// Level 2 - High priority
    Level2 = 2,

    /// Level 3 - Highest priority
    Level3 = 3,
}
