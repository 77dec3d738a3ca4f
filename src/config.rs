/// Points per millimetre.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

pub fn mm(value: f32) -> f32 {
    value * PT_PER_MM
}

/// Page geometry and font choice for the paginated output. All lengths in points.
#[derive(Clone, Debug, PartialEq)]
pub struct PageSetup {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    /// Proportional family looked up in the font directories; `None` uses Helvetica.
    pub body_font: Option<String>,
    /// Monospace family for code runs; `None` uses Courier.
    pub mono_font: Option<String>,
}

impl PageSetup {
    pub fn a4() -> Self {
        PageSetup {
            page_width: mm(210.0),
            page_height: mm(297.0),
            margin_top: mm(15.0),
            margin_bottom: mm(15.0),
            margin_left: mm(15.0),
            margin_right: mm(15.0),
            body_font: None,
            mono_font: None,
        }
    }

    pub fn letter() -> Self {
        PageSetup {
            page_width: 612.0,
            page_height: 792.0,
            margin_top: 72.0,
            margin_bottom: 72.0,
            margin_left: 72.0,
            margin_right: 72.0,
            body_font: None,
            mono_font: None,
        }
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        PageSetup::a4()
    }
}
