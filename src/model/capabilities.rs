use bitflags::bitflags;

bitflags! {
    /// Mechanics that have been switched on for this city.
    ///
    /// Passed into every tick through `TickContext` so a fixture can enable
    /// exactly the mechanics a test exercises.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Structures needing water lose up to half their efficiency when unwatered.
        const WATER_SCARCITY = 1 << 0;
        /// Fire events may occur.
        const FIRE_RISK      = 1 << 1;
        /// Epidemics may occur.
        const HEALTH         = 1 << 2;
    }
}
