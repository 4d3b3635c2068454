use crate::{
    algorithms::polygon_area,
    error::Result,
    types::{
        AreaScale, Opening, PageSidingSummary, Polygon, SidingHole, SidingPolygon, SidingSummary,
    },
};

fn summarize(gross_facade_sf: f64, hole_areas: &[f64]) -> SidingSummary {
    let openings_sf: f64 = hole_areas.iter().sum();
    SidingSummary {
        building_sf: None,
        roof_sf: None,
        gross_facade_sf,
        openings_sf,
        // Never negative, even when openings exceed the facade
        net_siding_sf: (gross_facade_sf - openings_sf).max(0.0),
        opening_count: hole_areas.len(),
    }
}

/// Gross, opening and net facade area, with areas in polygon units squared.
pub fn compute_siding_summary(exterior: &Polygon, holes: &[Polygon]) -> SidingSummary {
    let hole_areas: Vec<f64> = holes.iter().map(|hole| polygon_area(&hole.points)).collect();
    summarize(polygon_area(&exterior.points), &hole_areas)
}

/// Same as [`compute_siding_summary`] with pixel areas converted to square feet.
///
/// Fails with [`TakeoffError::InvalidScale`](crate::TakeoffError::InvalidScale)
/// unless the scale is positive and finite.
pub fn compute_siding_summary_scaled(
    exterior: &Polygon,
    holes: &[Polygon],
    scale: AreaScale,
) -> Result<SidingSummary> {
    scale.validate()?;
    let gross = scale.to_square_feet(polygon_area(&exterior.points));
    let hole_areas: Vec<f64> = holes
        .iter()
        .map(|hole| scale.to_square_feet(polygon_area(&hole.points)))
        .collect();
    Ok(summarize(gross, &hole_areas))
}

impl SidingPolygon {
    /// Measure a facade and its openings.
    pub fn build(exterior: Polygon, openings: Vec<Opening>, scale: AreaScale) -> Result<Self> {
        scale.validate()?;
        let holes: Vec<SidingHole> = openings
            .into_iter()
            .map(|opening| SidingHole {
                area_sf: scale.to_square_feet(opening.polygon.area()),
                class: opening.class,
                points: opening.polygon.points,
            })
            .collect();

        let gross = scale.to_square_feet(exterior.area());
        let hole_areas: Vec<f64> = holes.iter().map(|hole| hole.area_sf).collect();
        let summary = summarize(gross, &hole_areas);

        Ok(Self { exterior, holes, summary })
    }
}

/// Sum independently computed building summaries for one page.
pub fn summarize_page(buildings: &[SidingPolygon]) -> PageSidingSummary {
    let summaries: Vec<SidingSummary> = buildings.iter().map(|b| b.summary).collect();
    PageSidingSummary {
        total_buildings: summaries.len(),
        total_gross_facade_sf: summaries.iter().map(|s| s.gross_facade_sf).sum(),
        total_openings_sf: summaries.iter().map(|s| s.openings_sf).sum(),
        total_net_siding_sf: summaries.iter().map(|s| s.net_siding_sf).sum(),
        buildings: summaries,
    }
}
