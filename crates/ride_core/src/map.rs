//! Map interaction surface.
//!
//! Taps become pickup/dropoff selections; [`render_map_frame`] turns world
//! state into plain markers and polylines for whatever draws the map.

use bevy_ecs::prelude::{Resource, World};
use serde::Serialize;

use crate::ecs::Ride;
use crate::geo::{Coordinate, CoordinateError};
use crate::geocoding::{coordinate_label, place_label, GeocoderResource};
use crate::registry::drivers_in_order;
use crate::routing::{RouteProvider, RouteProviderResource, RouteResult, StraightLineRouteProvider};
use crate::session::active_ride;

/// Pickup/dropoff chosen on the map, with resolved labels and a route preview.
#[derive(Debug, Clone, Default, Resource)]
pub struct LocationSelection {
    pub pickup: Option<Coordinate>,
    pub dropoff: Option<Coordinate>,
    pub pickup_label: Option<String>,
    pub dropoff_label: Option<String>,
    pub route_preview: Option<RouteResult>,
}

impl LocationSelection {
    pub fn is_complete(&self) -> bool {
        self.pickup.is_some() && self.dropoff.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapClick {
    pub lat: f64,
    pub lng: f64,
}

/// Which end of the trip a tap set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedEnd {
    Pickup,
    Dropoff,
}

/// Applies a tap: first tap sets pickup, second sets dropoff, a third starts
/// over with a new pickup.
pub fn handle_map_click(world: &mut World, click: MapClick) -> Result<SelectedEnd, CoordinateError> {
    let point = Coordinate::new(click.lat, click.lng).validate()?;
    let label = world
        .get_resource::<GeocoderResource>()
        .map(|geocoder| place_label(geocoder.0.as_ref(), point))
        .unwrap_or_else(|| coordinate_label(point));

    let (end, both) = {
        let mut selection = world.get_resource_or_insert_with(LocationSelection::default);
        let end = match (selection.pickup, selection.dropoff) {
            (Some(_), None) => {
                selection.dropoff = Some(point);
                selection.dropoff_label = Some(label);
                SelectedEnd::Dropoff
            }
            _ => {
                *selection = LocationSelection {
                    pickup: Some(point),
                    pickup_label: Some(label),
                    ..Default::default()
                };
                SelectedEnd::Pickup
            }
        };
        (end, selection.pickup.zip(selection.dropoff))
    };
    log::debug!("map tap set {end:?} to {point}");

    if let Some((pickup, dropoff)) = both {
        let preview = match world.get_resource::<RouteProviderResource>() {
            Some(provider) => provider.0.route(pickup, dropoff),
            None => StraightLineRouteProvider.route(pickup, dropoff),
        };
        let preview = match preview {
            Ok(route) => Some(route),
            Err(err) => {
                log::warn!("route preview unavailable: {err}");
                None
            }
        };
        world.resource_mut::<LocationSelection>().route_preview = preview;
    }
    Ok(end)
}

pub fn clear_selection(world: &mut World) {
    if let Some(mut selection) = world.get_resource_mut::<LocationSelection>() {
        *selection = LocationSelection::default();
    }
}

/// `Pickup`/`Dropoff` belong to the ride on screen, or to the selection when
/// there is no ride. `Selected*` mark a new selection drawn over a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Pickup,
    Dropoff,
    SelectedPickup,
    SelectedDropoff,
    DriverAvailable,
    DriverBusy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub coordinate: Coordinate,
    pub label: String,
    pub kind: MarkerKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPolyline {
    pub id: String,
    pub points: Vec<Coordinate>,
    pub dashed: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapFrame {
    pub markers: Vec<MapMarker>,
    pub polylines: Vec<MapPolyline>,
}

/// Whether every end set in the selection is the ride's own.
fn selection_within_ride(selection: Option<&LocationSelection>, ride: &Ride) -> bool {
    selection.map_or(true, |s| {
        s.pickup.map_or(true, |p| p == ride.pickup)
            && s.dropoff.map_or(true, |d| d == ride.dropoff)
    })
}

fn end_marker(id: &str, kind: MarkerKind, prefix: &str, point: Coordinate, label: Option<&String>) -> MapMarker {
    let label = label.cloned().unwrap_or_else(|| coordinate_label(point));
    MapMarker {
        id: id.to_string(),
        coordinate: point,
        label: format!("{prefix}: {label}"),
        kind,
    }
}

/// Builds the frame in three layers: the session's ride, the selection, then
/// drivers.
///
/// An open ride is always drawn from its own endpoints. A completed ride stays
/// drawn until the selection moves away from its endpoints. Selection markers
/// and the route preview that do not belong to the ride are drawn on top.
pub fn render_map_frame(world: &World) -> MapFrame {
    let mut frame = MapFrame::default();
    let selection = world.get_resource::<LocationSelection>();
    let ride = active_ride(world).map(|(_, ride)| ride).filter(|ride| {
        !ride.status.is_terminal() || selection_within_ride(selection, ride)
    });

    let selection_is_ride = ride.is_some_and(|ride| selection_within_ride(selection, ride));
    let labels = |pickup: bool| {
        selection
            .filter(|_| selection_is_ride)
            .and_then(|s| if pickup { s.pickup_label.as_ref() } else { s.dropoff_label.as_ref() })
    };

    if let Some(ride) = ride {
        frame
            .markers
            .push(end_marker("pickup", MarkerKind::Pickup, "Pickup", ride.pickup, labels(true)));
        frame
            .markers
            .push(end_marker("dropoff", MarkerKind::Dropoff, "Dropoff", ride.dropoff, labels(false)));

        let preview = selection
            .filter(|s| selection_is_ride && s.is_complete())
            .and_then(|s| s.route_preview.as_ref());
        frame.polylines.push(match preview {
            Some(route) => MapPolyline {
                id: ride.id.to_string(),
                points: route.waypoints.clone(),
                dashed: false,
            },
            None => MapPolyline {
                id: ride.id.to_string(),
                points: vec![ride.pickup, ride.dropoff],
                dashed: true,
            },
        });
    }

    if let Some(selection) = selection.filter(|_| !selection_is_ride) {
        let (pickup_kind, dropoff_kind) = if ride.is_some() {
            (MarkerKind::SelectedPickup, MarkerKind::SelectedDropoff)
        } else {
            (MarkerKind::Pickup, MarkerKind::Dropoff)
        };
        if let Some(pickup) = selection.pickup {
            frame.markers.push(end_marker(
                "selected-pickup",
                pickup_kind,
                "Pickup",
                pickup,
                selection.pickup_label.as_ref(),
            ));
        }
        if let Some(dropoff) = selection.dropoff {
            frame.markers.push(end_marker(
                "selected-dropoff",
                dropoff_kind,
                "Dropoff",
                dropoff,
                selection.dropoff_label.as_ref(),
            ));
        }
        if let Some(route) = &selection.route_preview {
            frame.polylines.push(MapPolyline {
                id: "route".to_string(),
                points: route.waypoints.clone(),
                dashed: false,
            });
        }
    }

    for view in drivers_in_order(world) {
        if !view.position.is_valid() {
            continue;
        }
        let (kind, availability) = if view.driver.busy {
            (MarkerKind::DriverBusy, "On a job")
        } else {
            (MarkerKind::DriverAvailable, "Available")
        };
        frame.markers.push(MapMarker {
            id: view.driver.id.to_string(),
            coordinate: view.position,
            label: format!("{} · {} · {availability}", view.driver.name, view.driver.vehicle),
            kind,
        });
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Driver, DriverId, Position};
    use crate::registry::DriverRegistry;

    fn click(lat: f64, lng: f64) -> MapClick {
        MapClick { lat, lng }
    }

    #[test]
    fn taps_cycle_pickup_dropoff_then_restart() {
        let mut world = World::new();
        assert_eq!(handle_map_click(&mut world, click(-9.44, 147.18)), Ok(SelectedEnd::Pickup));
        assert_eq!(handle_map_click(&mut world, click(-9.45, 147.19)), Ok(SelectedEnd::Dropoff));
        {
            let selection = world.resource::<LocationSelection>();
            assert!(selection.is_complete());
            assert_eq!(
                selection.pickup_label.as_deref(),
                Some("Location (-9.440000, 147.180000)")
            );
            let preview = selection.route_preview.as_ref().expect("preview");
            assert_eq!(preview.waypoints.len(), 2);
        }

        assert_eq!(handle_map_click(&mut world, click(-9.46, 147.20)), Ok(SelectedEnd::Pickup));
        let selection = world.resource::<LocationSelection>();
        assert_eq!(selection.pickup, Some(Coordinate::new(-9.46, 147.20)));
        assert_eq!(selection.dropoff, None);
        assert!(selection.dropoff_label.is_none());
        assert!(selection.route_preview.is_none());
    }

    #[test]
    fn invalid_tap_changes_nothing() {
        let mut world = World::new();
        handle_map_click(&mut world, click(-9.44, 147.18)).expect("pickup");
        assert!(handle_map_click(&mut world, click(f64::INFINITY, 147.18)).is_err());
        let selection = world.resource::<LocationSelection>();
        assert_eq!(selection.dropoff, None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut world = World::new();
        handle_map_click(&mut world, click(-9.44, 147.18)).expect("pickup");
        handle_map_click(&mut world, click(-9.45, 147.19)).expect("dropoff");
        clear_selection(&mut world);
        let selection = world.resource::<LocationSelection>();
        assert!(selection.pickup.is_none() && selection.route_preview.is_none());
    }

    #[test]
    fn frame_places_dropoff_at_its_own_longitude() {
        let mut world = World::new();
        handle_map_click(&mut world, click(-9.44, 147.18)).expect("pickup");
        handle_map_click(&mut world, click(-9.45, 147.19)).expect("dropoff");
        let frame = render_map_frame(&world);
        let dropoff = frame
            .markers
            .iter()
            .find(|m| m.kind == MarkerKind::Dropoff)
            .expect("dropoff marker");
        assert_eq!(dropoff.coordinate, Coordinate::new(-9.45, 147.19));
        assert_eq!(frame.polylines.len(), 1);
        assert!(!frame.polylines[0].dashed);
    }

    #[test]
    fn frame_labels_drivers_and_skips_invalid_positions() {
        let mut world = World::new();
        let mut registry = DriverRegistry::default();
        let free = world
            .spawn((Driver::new(DriverId(0), "Aeta", "Toyota Vios"), Position(Coordinate::new(-9.43, 147.17))))
            .id();
        registry.register(DriverId(0), free);
        let mut busy_driver = Driver::new(DriverId(1), "Bena", "Honda City");
        busy_driver.assign(Coordinate::new(-9.44, 147.18));
        let busy = world
            .spawn((busy_driver, Position(Coordinate::new(-9.42, 147.16))))
            .id();
        registry.register(DriverId(1), busy);
        let lost = world
            .spawn((Driver::new(DriverId(2), "Cadi", "Nissan Almera"), Position(Coordinate::new(f64::NAN, 147.0))))
            .id();
        registry.register(DriverId(2), lost);
        world.insert_resource(registry);

        let frame = render_map_frame(&world);
        let labels: Vec<&str> = frame.markers.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Aeta · Toyota Vios · Available",
                "Bena · Honda City · On a job"
            ]
        );
        assert_eq!(frame.markers[1].kind, MarkerKind::DriverBusy);
        assert!(frame.polylines.is_empty());
    }
}
