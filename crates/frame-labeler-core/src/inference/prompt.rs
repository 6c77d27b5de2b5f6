/// Labeling guidelines sent with every frame.
pub const LABELING_INSTRUCTIONS: &str = "We put head cameras on babies to study what they see in their everyday interactions. The following images were recorded by head cameras on babies. We are interested in the objects in a baby's environment- your task is to label the objects you see. Babies move their heads rapidly sometimes, creating blurry images. We want you to try to say what objects are in the videos even though sometimes it will be hard.

To ensure you provide object names of the kind we want, we have a set of instructions that we want you to follow. To check on how well you are following these instructions, we have included some images that have already been coded by these instructions. Workers whose answers do not match the pre-coded answers will not be approved. We know some pictures are dark or blurry, make an honest effort and you will be approved. Just do your best and feedback on our instructions is very much welcomed.

INSTRUCTIONS

1. We are not interested in people and body parts, so do not name them. We are interested in their clothing and accessories, however. So do NOT label the face or nose but DO label the glasses, earring, etc.
2. The pictures in this set are all from one baby and are ordered in time, so if you can recognize an object in a picture that is blurry in the later one (because the baby moved her head!) please label the blurry object in the same way that you did in an earlier picture.
3. Note if there is a blurry then clear picture of the same scene, you cannot go back. They must be done in order.
4. Name objects with one every day noun - the kinds of object names that babies learn.
5. Typically the label should be one word, for example \"spoon\" - not baby spoon, or silver spoon.
6. Some scenes will show babies looking at books or screens or furniture with images on them. You can label both the object (book, TV, chair) and the images being displayed on that object.
7. We are interested in the objects the baby is likely to be attending to, so name the individual objects first and background objects only if there are no other objects in view. A picture with lots of objects should not have background objects such as floor and wall named.
8. An image with few objects can have background objects like the window and carpet named. Even if the scene is sparse, with just one object, try to name at least three things.
9. If there are multiple objects in the same object category only name the object once (letters). When there are few foreground objects, also label the wall.
10. Remember, People and Body parts are NOT objects.
";
