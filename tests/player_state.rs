//! A record type written the way generated code would write it: a layout
//! with fixed fields, text, arrays and nested objects, and a typed view.
use rift::{
  declare_fixed_size, objects, schema_id, AlignedBuf, BufferBuilder, Nested,
  ObjectLayout, ObjectView, RiftErr, SchemaView, SequenceView, TextView,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vec3 {
  x: f32,
  y: f32,
  z: f32,
}

declare_fixed_size!(Vec3 { x: f32, y: f32, z: f32 });

#[derive(Clone, Debug, Default, PartialEq)]
struct Waypoint {
  x:    f32,
  y:    f32,
  tick: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Player {
  id:        u64,
  position:  Vec3,
  health:    f32,
  alive:     bool,
  level:     u8,
  name:      String,
  inventory: Vec<u32>,
  waypoints: Vec<Waypoint>,
  scores:    Vec<f32>,
}

// Waypoint: header, x at 16, y at 20, tick at 24.
struct WaypointLayout;

impl ObjectLayout for WaypointLayout {
  const FIXED_SIZE: usize = 28;
  const NUM_ENTRIES: usize = 0;
  const SCHEMA_ID: u32 = 0x5750_0001;
  const TABLE_OFFSET: usize = 28;
}

#[derive(Copy, Clone, Debug)]
struct WaypointView<'a>(ObjectView<'a>);

impl<'a> SchemaView<'a> for WaypointView<'a> {
  type Layout = WaypointLayout;

  fn from_object(object: ObjectView<'a>) -> Self {
    WaypointView(object)
  }

  fn object(&self) -> ObjectView<'a> {
    self.0
  }
}

impl<'a> WaypointView<'a> {
  fn to_waypoint(self) -> Result<Waypoint, RiftErr> {
    Ok(Waypoint {
      x:    self.fixed_field(16)?,
      y:    self.fixed_field(20)?,
      tick: self.fixed_field(24)?,
    })
  }
}

// Player: header, id at 16, position at 24, health at 36, alive at 40,
// level at 41, then four offset entries at 44: name, inventory, waypoints,
// scores.
struct PlayerLayout;

impl ObjectLayout for PlayerLayout {
  const FIXED_SIZE: usize = 76;
  const NUM_ENTRIES: usize = 4;
  const TABLE_OFFSET: usize = 44;
  const SCHEMA_ID: u32 = 0x504C_0001;
}

#[derive(Copy, Clone, Debug)]
struct PlayerView<'a>(ObjectView<'a>);

impl<'a> SchemaView<'a> for PlayerView<'a> {
  type Layout = PlayerLayout;

  fn from_object(object: ObjectView<'a>) -> Self {
    PlayerView(object)
  }

  fn object(&self) -> ObjectView<'a> {
    self.0
  }
}

impl<'a> PlayerView<'a> {
  fn id(&self) -> Result<u64, RiftErr> {
    self.fixed_field(16)
  }

  fn position(&self) -> Result<Vec3, RiftErr> {
    self.fixed_field(24)
  }

  fn health(&self) -> Result<f32, RiftErr> {
    self.fixed_field(36)
  }

  fn alive(&self) -> Result<bool, RiftErr> {
    self.fixed_field(40)
  }

  fn level(&self) -> Result<u8, RiftErr> {
    self.fixed_field(41)
  }

  fn name(&self) -> Result<Option<TextView<'a>>, RiftErr> {
    self.text_field(0)
  }

  fn inventory(&self) -> Result<Option<SequenceView<'a, u32>>, RiftErr> {
    self.sequence_field(1)
  }

  fn waypoints(
    &self,
  ) -> Result<Option<SequenceView<'a, Nested<WaypointView<'a>>>>, RiftErr> {
    self.sequence_field(2)
  }

  fn scores(&self) -> Result<Option<SequenceView<'a, f32>>, RiftErr> {
    self.sequence_field(3)
  }

  fn to_player(self) -> Result<Player, RiftErr> {
    let waypoints = match self.waypoints()? {
      Some(seq) => seq
        .iter()
        .map(|view| view?.to_waypoint())
        .collect::<Result<Vec<_>, _>>()?,
      None => Vec::new(),
    };
    Ok(Player {
      id: self.id()?,
      position: self.position()?,
      health: self.health()?,
      alive: self.alive()?,
      level: self.level()?,
      name: match self.name()? {
        Some(text) => text.to_owned_string()?,
        None => String::new(),
      },
      inventory: self.inventory()?.map_or(Ok(Vec::new()), |s| s.to_vec())?,
      waypoints,
      scores: self.scores()?.map_or(Ok(Vec::new()), |s| s.to_vec())?,
    })
  }
}

fn write_waypoint(
  builder: &mut BufferBuilder,
  waypoint: &Waypoint,
) -> Result<(), RiftErr> {
  let object = WaypointLayout::begin_object(builder);
  builder.write_value(waypoint.x);
  builder.write_value(waypoint.y);
  builder.write_value(waypoint.tick);
  builder.end_object(object)?;
  Ok(())
}

fn write_player(
  builder: &mut BufferBuilder,
  player: &Player,
) -> Result<u32, RiftErr> {
  let object = PlayerLayout::begin_object(builder);
  builder.write_value(player.id);
  builder.write_value(player.position);
  builder.write_value(player.health);
  builder.write_value(player.alive);
  builder.write_value(player.level);
  builder.pad_to_alignment(4)?;
  let name = builder.reserve_offset_entry();
  let inventory = builder.reserve_offset_entry();
  let waypoints = builder.reserve_offset_entry();
  let scores = builder.reserve_offset_entry();
  assert_eq!(object.relative(builder.len()), PlayerLayout::FIXED_SIZE);

  builder.add_variable_field(&object, name, player.name.as_str())?;
  builder.add_variable_field(&object, inventory, &player.inventory)?;
  let run = builder.add_objects(&player.waypoints, write_waypoint)?;
  builder.link_entry(&object, waypoints, run)?;
  builder.add_variable_field(&object, scores, &player.scores)?;
  builder.end_object(object)
}

fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

fn sample_player() -> Player {
  Player {
    id:        0x0123_4567_89AB_CDEF,
    position:  Vec3 {
      x: 1.5,
      y: -2.0,
      z: 64.0,
    },
    health:    87.5,
    alive:     true,
    level:     12,
    name:      "Lady Ada".into(),
    inventory: vec![101, 202, 303, 404],
    waypoints: vec![
      Waypoint {
        x:    0.0,
        y:    0.0,
        tick: 1,
      },
      Waypoint {
        x:    10.0,
        y:    -5.5,
        tick: 40,
      },
      Waypoint {
        x:    3.25,
        y:    8.0,
        tick: 95,
      },
    ],
    scores:    vec![0.5, 0.75],
  }
}

fn build(players: &[Player]) -> Result<AlignedBuf, RiftErr> {
  let mut builder = BufferBuilder::new();
  for player in players {
    write_player(&mut builder, player)?;
  }
  Ok(builder.into_buffer())
}

#[test]
fn round_trip() -> Result<(), RiftErr> {
  init_logger();
  let player = sample_player();
  let buffer = build(core::slice::from_ref(&player))?;

  let view = PlayerView::new(&buffer)?;
  assert_eq!(view.object().total_size() as usize, buffer.len());
  assert_eq!(view.name()?.unwrap(), "Lady Ada");
  assert_eq!(view.inventory()?.unwrap().at(2)?, 303);
  let second = view.waypoints()?.unwrap().at(1)?;
  assert_eq!(second.object().schema_id(), WaypointLayout::SCHEMA_ID);
  assert_eq!(second.to_waypoint()?.tick, 40);
  assert_eq!(view.to_player()?, player);
  Ok(())
}

#[test]
fn empty_collections_are_absent() -> Result<(), RiftErr> {
  let player = Player {
    id: 7,
    ..Player::default()
  };
  let buffer = build(&[player.clone()])?;
  let view = PlayerView::new(&buffer)?;

  // Empty text is still written; empty arrays are not.
  assert_eq!(view.name()?.map(|name| name.len()), Some(0));
  assert!(view.inventory()?.is_none());
  assert!(view.waypoints()?.is_none());
  assert!(view.scores()?.is_none());
  assert_eq!(view.object().total_size(), 76 + 1);
  assert_eq!(view.to_player()?, player);
  Ok(())
}

#[test]
fn many_players_in_one_buffer() -> Result<(), RiftErr> {
  init_logger();
  let players = (0..5u64)
    .map(|i| Player {
      id: i,
      name: format!("player-{i}"),
      inventory: (0..i as u32).collect(),
      ..sample_player()
    })
    .collect::<Vec<_>>();
  let buffer = build(&players)?;

  let decoded = objects(&buffer)
    .map(|object| PlayerView::from_checked(object?)?.to_player())
    .collect::<Result<Vec<_>, _>>()?;
  assert_eq!(decoded, players);
  Ok(())
}

#[test]
fn wrong_schema_is_rejected() -> Result<(), RiftErr> {
  let mut builder = BufferBuilder::new();
  write_waypoint(&mut builder, &Waypoint::default())?;
  let buffer = builder.into_buffer();

  let err = PlayerView::new(&buffer).unwrap_err();
  assert!(err.is_invalid_buffer());
  assert!(matches!(err, RiftErr::SchemaMismatch {
    expected: PlayerLayout::SCHEMA_ID,
    ..
  }));
  assert!(WaypointView::new(&buffer).is_ok());
  Ok(())
}

#[test]
fn corrupt_buffers() -> Result<(), RiftErr> {
  let buffer = build(&[sample_player()])?;

  // Truncated: the header claims more bytes than there are.
  let truncated = AlignedBuf::from_slice(&buffer[..buffer.len() - 1]);
  let err = PlayerView::new(&truncated).unwrap_err();
  assert!(matches!(err, RiftErr::TotalSizeOverflow { .. }));

  // The inventory entry (table index 1) points past the object.
  let mut bytes = buffer.to_vec();
  bytes[52..56].copy_from_slice(&0xFFF0u32.to_le_bytes());
  let corrupt = AlignedBuf::from_slice(&bytes);
  let view = PlayerView::new(&corrupt)?;
  assert!(view.inventory().unwrap_err().is_bounds_violation());
  assert_eq!(view.name()?.unwrap(), "Lady Ada");

  // The scores entry (table index 3) is misaligned for `f32`.
  let mut bytes = buffer.to_vec();
  let scores = u32::from_le_bytes([bytes[68], bytes[69], bytes[70], bytes[71]]);
  bytes[68..72].copy_from_slice(&(scores + 1).to_le_bytes());
  let corrupt = AlignedBuf::from_slice(&bytes);
  let view = PlayerView::new(&corrupt)?;
  assert!(view.scores().unwrap_err().is_alignment_violation());
  Ok(())
}

#[test]
fn schema_ids_from_names() {
  let player = schema_id("game.PlayerState");
  let waypoint = schema_id("game.Waypoint");
  assert_ne!(player, waypoint);
  assert_eq!(player, schema_id("game.PlayerState"));
}
