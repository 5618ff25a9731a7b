use rand::Rng;

// ============================================================================
// Configuration
// ============================================================================

pub const FIELD_WIDTH: usize = 10;
pub const FIELD_HEIGHT: usize = 20;
/// Stack capacity. An append attempt beyond this ends the game.
pub const MAX_ROWS: usize = FIELD_HEIGHT - 1;

// Fall speed (cells per tick)
const DROP_STEP: i16 = 1;
const FAST_DROP_STEP: i16 = 6;

// ============================================================================
// Shapes
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ShapeKind {
    Square,
    Stick,
    Boat,
    LeftL,
    RightL,
    LeftS,
    RightS,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 7] = [
        ShapeKind::Square,
        ShapeKind::Stick,
        ShapeKind::Boat,
        ShapeKind::LeftL,
        ShapeKind::RightL,
        ShapeKind::LeftS,
        ShapeKind::RightS,
    ];

    fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// An immutable cell pattern within a `width` x `height` bounding box.
/// Cells are (col, row) pairs with row 0 at the top.
#[derive(Clone, Debug)]
pub struct Shape {
    pub kind: ShapeKind,
    pub width: i16,
    pub height: i16,
    pub cells: Vec<(i16, i16)>,
}

impl Shape {
    pub fn canonical(kind: ShapeKind) -> Self {
        let (width, height, cells): (i16, i16, &[(i16, i16)]) = match kind {
            ShapeKind::Square => (2, 2, &[(0, 0), (0, 1), (1, 0), (1, 1)]),
            ShapeKind::Stick => (4, 1, &[(0, 0), (1, 0), (2, 0), (3, 0)]),
            ShapeKind::Boat => (3, 2, &[(0, 0), (1, 0), (2, 0), (1, 1)]),
            ShapeKind::LeftL => (2, 3, &[(0, 0), (0, 1), (0, 2), (1, 2)]),
            ShapeKind::RightL => (2, 3, &[(1, 0), (1, 1), (0, 2), (1, 2)]),
            ShapeKind::LeftS => (3, 2, &[(0, 0), (1, 0), (1, 1), (2, 1)]),
            ShapeKind::RightS => (3, 2, &[(1, 0), (2, 0), (0, 1), (1, 1)]),
        };
        Self {
            kind,
            width,
            height,
            cells: cells.to_vec(),
        }
    }

    /// Returns the shape rotated 90 degrees clockwise (the y axis points
    /// down), with width and height swapped.
    ///
    /// Each cell center is rotated about the bounding-box center, the whole
    /// pattern is re-anchored so its box starts at the origin again, and the
    /// centers are snapped back to integer cells. The transform accepts any
    /// cell pattern, not just the seven stock shapes.
    pub fn rotated_clockwise(&self) -> Shape {
        let mid_x = self.width as f64 / 2.0;
        let mid_y = self.height as f64 / 2.0;
        let rotate = |x: f64, y: f64| (mid_x + (y - mid_y), mid_y - (x - mid_x));

        // The old top-right corner maps to the new origin.
        let (corner_x, corner_y) = rotate(self.width as f64, 0.0);

        let cells = self
            .cells
            .iter()
            .map(|&(col, row)| {
                let (x, y) = rotate(col as f64 + 0.5, row as f64 + 0.5);
                (
                    (x - corner_x - 0.5).round() as i16,
                    (y - corner_y - 0.5).round() as i16,
                )
            })
            .collect();

        Shape {
            kind: self.kind,
            width: self.height,
            height: self.width,
            cells,
        }
    }

    fn sorted_cells(&self) -> Vec<(i16, i16)> {
        let mut cells = self.cells.clone();
        cells.sort_unstable();
        cells
    }
}

// Equality is by value: dimensions plus cell set, regardless of cell order
// or originating kind.
impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.sorted_cells() == other.sorted_cells()
    }
}

impl Eq for Shape {}

// ============================================================================
// Piece
// ============================================================================

/// A shape positioned in the field. (x, y) is the bounding-box origin in
/// cell coordinates; y grows downward.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Piece {
    pub shape: Shape,
    pub x: i16,
    pub y: i16,
}

impl Piece {
    pub fn new(shape: Shape, x: i16, y: i16) -> Self {
        Self { shape, x, y }
    }

    /// Builds a piece at the top of the field, horizontally centered and
    /// rounded to a whole cell.
    pub fn spawn(shape: Shape) -> Self {
        let x = ((FIELD_WIDTH as f64 - shape.width as f64) / 2.0).round() as i16;
        Self { shape, x, y: 0 }
    }

    /// Pure translation. Bounds and collisions are the caller's problem.
    pub fn moved(&self, dx: i16, dy: i16) -> Self {
        Self {
            shape: self.shape.clone(),
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Clockwise rotation in place; the bounding-box origin stays put.
    pub fn rotated(&self) -> Self {
        Self {
            shape: self.shape.rotated_clockwise(),
            x: self.x,
            y: self.y,
        }
    }

    /// Occupied cells in absolute field coordinates.
    pub fn cells(&self) -> Vec<(i16, i16)> {
        self.shape
            .cells
            .iter()
            .map(|&(col, row)| (self.x + col, self.y + row))
            .collect()
    }
}

// ============================================================================
// Field
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cell {
    Empty,
    Filled(ShapeKind),
}

impl Cell {
    pub fn is_filled(&self) -> bool {
        *self != Cell::Empty
    }
}

/// One horizontal slice of the stack, always `FIELD_WIDTH` cells wide.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Row {
    cells: [Cell; FIELD_WIDTH],
}

impl Row {
    fn new() -> Self {
        Self {
            cells: [Cell::Empty; FIELD_WIDTH],
        }
    }

    pub fn cell(&self, col: usize) -> Cell {
        self.cells[col]
    }

    pub fn cells(&self) -> &[Cell; FIELD_WIDTH] {
        &self.cells
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Cell::is_filled)
    }
}

/// The settled stack. Rows are stored bottom-to-top (index 0 sits on the
/// floor) and appended lazily as pieces land; the grid is never
/// pre-allocated to full height.
#[derive(Clone, Debug, Default)]
pub struct Field {
    rows: Vec<Row>,
}

impl Field {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Index of the highest row present, or `None` for an empty field.
    pub fn top_row_index(&self) -> Option<usize> {
        self.rows.len().checked_sub(1)
    }

    // Stack index of the row covering the given absolute cell row, if any.
    fn row_index(&self, row: i16) -> Option<usize> {
        if row < 0 || row >= FIELD_HEIGHT as i16 {
            return None;
        }
        let index = FIELD_HEIGHT - 1 - row as usize;
        (index < self.rows.len()).then_some(index)
    }

    /// True if any piece cell is outside the side walls, at or below the
    /// floor, or coincides with a filled cell of the stack.
    pub fn collides(&self, piece: &Piece) -> bool {
        for (col, row) in piece.cells() {
            if col < 0 || col >= FIELD_WIDTH as i16 {
                return true;
            }
            if row >= FIELD_HEIGHT as i16 {
                return true;
            }
            if let Some(index) = self.row_index(row) {
                if self.rows[index].cell(col as usize).is_filled() {
                    return true;
                }
            }
        }
        false
    }

    /// Appends empty rows until the stack covers the piece's topmost cell
    /// row. Returns false, without appending further, once the stack would
    /// exceed `MAX_ROWS` -- the sole game-over trigger.
    pub fn grow_to_accommodate(&mut self, piece: &Piece) -> bool {
        while self.rows.is_empty() || piece.y < (FIELD_HEIGHT - self.rows.len()) as i16 {
            if self.rows.len() >= MAX_ROWS {
                return false;
            }
            self.rows.push(Row::new());
        }
        true
    }

    /// Marks the piece's cells in the rows that exist. Cells outside the
    /// current stack or outside the column range are silently ignored.
    pub fn commit(&mut self, piece: &Piece) {
        let kind = piece.shape.kind;
        for (col, row) in piece.cells() {
            if col < 0 || col >= FIELD_WIDTH as i16 {
                continue;
            }
            if let Some(index) = self.row_index(row) {
                self.rows[index].cells[col as usize] = Cell::Filled(kind);
            }
        }
    }

    /// Removes every full row, scanning top to bottom, letting the rows
    /// above slide down one slot per removed row. Returns the count.
    pub fn clear_full_rows(&mut self) -> u32 {
        let mut cleared = 0;
        for index in (0..self.rows.len()).rev() {
            if self.rows[index].is_full() {
                self.rows.remove(index);
                cleared += 1;
            }
        }
        cleared
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameEvent {
    NextShapeChanged(ShapeKind),
    RowsCleared(u32),
    PieceSettled,
    GameOver,
}

// ============================================================================
// Shape Provider Trait
// ============================================================================

pub trait ShapeProvider {
    fn next_shape(&mut self) -> ShapeKind;
}

struct RandomShapeProvider;

impl ShapeProvider for RandomShapeProvider {
    fn next_shape(&mut self) -> ShapeKind {
        ShapeKind::random()
    }
}

pub struct SequenceShapeProvider {
    shapes: Vec<ShapeKind>,
    index: usize,
}

impl SequenceShapeProvider {
    pub fn new(shapes: Vec<ShapeKind>) -> Self {
        Self { shapes, index: 0 }
    }
}

impl ShapeProvider for SequenceShapeProvider {
    fn next_shape(&mut self) -> ShapeKind {
        let shape = self.shapes[self.index % self.shapes.len()];
        self.index += 1;
        shape
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Read-only view of the engine state for a presentation layer.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub piece_shape: Shape,
    pub piece_x: i16,
    pub piece_y: i16,
    /// Stack rows, bottom-to-top.
    pub field_rows: Vec<Row>,
    pub next_shape: ShapeKind,
    pub game_over: bool,
}

// ============================================================================
// Game
// ============================================================================

pub struct Game {
    pub field: Field,
    pub current: Piece,
    pub next_shape: Shape,
    drop_fast: bool,
    game_over: bool,
    shape_provider: Box<dyn ShapeProvider>,
    events: Vec<GameEvent>,
}

impl Game {
    pub fn new() -> Self {
        Self::with_provider(Box::new(RandomShapeProvider))
    }

    pub fn with_provider(mut provider: Box<dyn ShapeProvider>) -> Self {
        let next_shape = Shape::canonical(provider.next_shape());
        let mut game = Self {
            field: Field::new(),
            current: Piece::spawn(next_shape.clone()),
            next_shape,
            drop_fast: false,
            game_over: false,
            shape_provider: provider,
            events: Vec::new(),
        };
        game.spawn();
        game
    }

    /// Builds a game over a prepared field and piece, for tests.
    pub fn with_field(field: Field, current: Piece) -> Self {
        let mut provider: Box<dyn ShapeProvider> = Box::new(RandomShapeProvider);
        let next_shape = Shape::canonical(provider.next_shape());
        Self {
            field,
            current,
            next_shape,
            drop_fast: false,
            game_over: false,
            shape_provider: provider,
            events: Vec::new(),
        }
    }

    /// Replaces the falling piece with one built from the queued shape and
    /// queues a fresh random shape. Spawning straight into the stack ends
    /// the game.
    pub fn spawn(&mut self) {
        let shape = std::mem::replace(
            &mut self.next_shape,
            Shape::canonical(self.shape_provider.next_shape()),
        );
        self.events
            .push(GameEvent::NextShapeChanged(self.next_shape.kind));
        self.current = Piece::spawn(shape);
        self.drop_fast = false;

        if self.field.collides(&self.current) {
            self.game_over = true;
            self.events.push(GameEvent::GameOver);
        }
    }

    /// One time-step: move the piece down, or settle it where it landed.
    pub fn tick(&mut self) {
        if self.game_over {
            return;
        }

        let step = if self.drop_fast {
            FAST_DROP_STEP
        } else {
            DROP_STEP
        };
        let moved = self.current.moved(0, step);
        if !self.field.collides(&moved) {
            self.current = moved;
            return;
        }

        // Back the piece up to the last free cell, bounded by the top edge.
        let mut landed = moved;
        while self.field.collides(&landed) && landed.y > 0 {
            landed = landed.moved(0, -1);
        }
        self.current = landed;
        self.settle();
    }

    fn settle(&mut self) {
        let accommodated = self.field.grow_to_accommodate(&self.current);
        // Commit even when the stack hit the ceiling, so the final state
        // shows the piece that ended the game.
        self.field.commit(&self.current);

        if !accommodated {
            self.game_over = true;
            self.events.push(GameEvent::GameOver);
            return;
        }

        let cleared = self.field.clear_full_rows();
        if cleared > 0 {
            self.events.push(GameEvent::RowsCleared(cleared));
        }
        self.events.push(GameEvent::PieceSettled);
        self.spawn();
    }

    pub fn move_left(&mut self) {
        self.shift(-1);
    }

    pub fn move_right(&mut self) {
        self.shift(1);
    }

    fn shift(&mut self, dx: i16) {
        if self.game_over {
            return;
        }
        let moved = self.current.moved(dx, 0);
        if !self.field.collides(&moved) {
            self.current = moved;
        }
    }

    /// Rotates the falling piece clockwise, unconditionally. The rotation is
    /// not checked against walls or the stack; an overlapping result is left
    /// to the normal collision rules on later moves.
    pub fn rotate(&mut self) {
        if self.game_over {
            return;
        }
        self.current = self.current.rotated();
    }

    /// Latches the accelerated fall speed. Cleared on every spawn.
    pub fn set_drop_fast(&mut self, drop_fast: bool) {
        if self.game_over {
            return;
        }
        self.drop_fast = drop_fast;
    }

    /// Starts a fresh game: empty field, new shape queue. Valid from any
    /// state, including game over.
    pub fn reset(&mut self) {
        self.field = Field::new();
        self.game_over = false;
        self.drop_fast = false;
        self.events.clear();
        self.next_shape = Shape::canonical(self.shape_provider.next_shape());
        self.spawn();
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            piece_shape: self.current.shape.clone(),
            piece_x: self.current.x,
            piece_y: self.current.y,
            field_rows: self.field.rows().to_vec(),
            next_shape: self.next_shape.kind,
            game_over: self.game_over,
        }
    }

    /// Returns the full visual grid, top row first: the settled stack laid
    /// out at the bottom with the falling piece overlaid.
    pub fn render_grid(&self) -> Vec<Vec<Cell>> {
        let mut grid = vec![vec![Cell::Empty; FIELD_WIDTH]; FIELD_HEIGHT];

        for (index, row) in self.field.rows().iter().enumerate() {
            grid[FIELD_HEIGHT - 1 - index] = row.cells().to_vec();
        }

        for (col, row) in self.current.cells() {
            if (0..FIELD_WIDTH as i16).contains(&col) && (0..FIELD_HEIGHT as i16).contains(&row) {
                grid[row as usize][col as usize] = Cell::Filled(self.current.shape.kind);
            }
        }

        grid
    }

    /// Takes and clears all pending events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use super::*;

    /// A field pre-grown to the given number of empty rows.
    pub fn field_with_empty_rows(count: usize) -> Field {
        let mut field = Field::new();
        for _ in 0..count {
            field.rows.push(Row::new());
        }
        field
    }

    /// Fills a single cell of the given stack row.
    pub fn fill_cell(field: &mut Field, index: usize, col: usize) {
        field.rows[index].cells[col] = Cell::Filled(ShapeKind::Boat);
    }

    /// Fills every cell of the given stack row.
    pub fn fill_field_row(field: &mut Field, index: usize) {
        for col in 0..FIELD_WIDTH {
            fill_cell(field, index, col);
        }
    }

    /// Fills the given stack row except one column.
    pub fn fill_field_row_with_gap(field: &mut Field, index: usize, gap_col: usize) {
        for col in 0..FIELD_WIDTH {
            if col != gap_col {
                fill_cell(field, index, col);
            }
        }
    }

    /// Occupancy of one stack row as booleans, by column.
    pub fn row_occupancy(field: &Field, index: usize) -> [bool; FIELD_WIDTH] {
        let mut occupancy = [false; FIELD_WIDTH];
        for (col, cell) in field.rows()[index].cells().iter().enumerate() {
            occupancy[col] = cell.is_filled();
        }
        occupancy
    }
}
