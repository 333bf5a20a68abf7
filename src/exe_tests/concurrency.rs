use glam::Mat4;
use anim_3l14::offline::{AnimationBuilder, RawAnimation, RawJointTrack, RawKey};
use anim_3l14::{Animation, SamplingCache, SamplingJob};
use animrt_3l14::character::Character;
use animrt_3l14::millipede::{JointBoxes, Millipede};
use math_3l14::SoaTransform;
use nab_3l14::timing::FSeconds;

fn characters(millipede: &Millipede, mesh: &JointBoxes, count: usize) -> Vec<Character>
{
    (0..count).map(|c|
    {
        let mut character = Character::new(millipede, mesh);
        character.controller.time = FSeconds(c as f32 * 0.37);
        character.controller.speed = 1.0 + (c % 4) as f32 * 0.5;
        character.root = Mat4::from_translation(glam::Vec3::new(c as f32, 0.0, 0.0));
        character
    }).collect()
}

#[test]
fn threaded_characters_match_sequential()
{
    let millipede = Millipede::build(6).unwrap();
    let mesh = JointBoxes::new(&millipede.skeleton);
    let mut sequential = characters(&millipede, &mesh, 24);
    let mut threaded = characters(&millipede, &mesh, 24);

    for _ in 0..10
    {
        for character in &mut sequential
        {
            character.update(&millipede, &mesh, FSeconds(1.0 / 30.0)).unwrap();
        }

        crossbeam::scope(|scope|
        {
            for chunk in threaded.chunks_mut(5)
            {
                let (millipede, mesh) = (&millipede, &mesh);
                scope.spawn(move |_|
                {
                    for character in chunk
                    {
                        character.update(millipede, mesh, FSeconds(1.0 / 30.0)).unwrap();
                    }
                });
            }
        }).unwrap();
    }

    for (a, b) in sequential.iter().zip(&threaded)
    {
        assert_eq!(a.controller, b.controller);
        assert_eq!(a.models(), b.models());
        assert_eq!(a.skinned_positions(), b.skinned_positions());
        assert_eq!(a.skinned_normals(), b.skinned_normals());
    }
}

#[test]
fn one_cache_many_animations()
{
    let millipede = Millipede::build(4).unwrap();
    let walk = &millipede.walk;

    // same track count as the walk, so a stale cursor would still be in range
    let mut raw = RawAnimation { duration: 2.0, tracks: vec![RawJointTrack::default(); walk.num_tracks()] };
    for (track, keys) in raw.tracks.iter_mut().enumerate()
    {
        keys.translations = (0..5).map(|k| RawKey { time: k as f32 * 0.5, value: glam::Vec3::splat((track + k) as f32) }).collect();
    }
    let other = AnimationBuilder.build(&raw).unwrap();

    let sample = |animation: &Animation, cache: &mut SamplingCache, time: f32|
    {
        let mut output = vec![SoaTransform::IDENTITY; walk.num_soa_tracks()];
        SamplingJob { time, animation: Some(animation), cache: Some(cache), output: &mut output }.run().unwrap();
        output
    };

    let mut shared = SamplingCache::new(walk.num_tracks());
    for &time in &[0.3, 1.1, 1.9, 0.6, 1.7]
    {
        let walk_pose = sample(walk, &mut shared, time * 3.0);
        let other_pose = sample(&other, &mut shared, time);
        assert_eq!(walk_pose, sample(walk, &mut SamplingCache::new(walk.num_tracks()), time * 3.0));
        assert_eq!(other_pose, sample(&other, &mut SamplingCache::new(walk.num_tracks()), time));
    }
}
